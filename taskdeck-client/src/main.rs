//! # Taskdeck CLI
//!
//! Command-line front end for the Taskdeck API.
//!
//! ## Usage
//!
//! ```bash
//! taskdeck login --email ada@example.com --password secret1
//! taskdeck list --status pending --page 2
//! taskdeck add "Write report" --priority high --tag work
//! taskdeck done <TASK_ID>
//! ```
//!
//! Configuration comes from the environment (see `taskdeck_client::config`);
//! logs go to stderr and are controlled with `RUST_LOG`.

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use taskdeck_client::app::AppContext;
use taskdeck_client::config::ClientConfig;
use taskdeck_client::session::SessionEvent;
use taskdeck_shared::models::{
    LoginCredentials, RegistrationForm, Task, TaskDraft, TaskFilter, TaskPatch, TaskPriority,
    TaskStatus,
};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "taskdeck")]
#[command(version)]
#[command(about = "Manage your Taskdeck tasks from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Signs in and stores the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Creates an account and signs in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Must match --password
        #[arg(long = "confirm")]
        confirm_password: String,
    },
    /// Forgets the stored session
    Logout,
    /// Shows the signed-in user
    Whoami,
    /// Lists one page of tasks
    List {
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        priority: Option<TaskPriority>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Shows a single task
    Show {
        #[arg(value_name = "TASK_ID")]
        id: String,
    },
    /// Creates a task
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        priority: Option<TaskPriority>,
        /// RFC 3339 timestamp, e.g. 2026-11-01T17:00:00Z
        #[arg(long)]
        due: Option<DateTime<Utc>>,
        /// May be repeated
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Changes fields of a task
    Update {
        #[arg(value_name = "TASK_ID")]
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        priority: Option<TaskPriority>,
        #[arg(long)]
        due: Option<DateTime<Utc>>,
        /// Replaces all tags; may be repeated
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Marks a task completed
    Done {
        #[arg(value_name = "TASK_ID")]
        id: String,
    },
    /// Deletes a task
    Rm {
        #[arg(value_name = "TASK_ID")]
        id: String,
    },
    /// Shows task counts per status
    Stats,
    /// Checks that the API is reachable
    Health,
}

impl Command {
    fn needs_session(&self) -> bool {
        !matches!(
            self,
            Command::Login { .. } | Command::Register { .. } | Command::Logout | Command::Health
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskdeck=info,taskdeck_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = ClientConfig::from_env().context("Failed to load configuration")?;
    tracing::debug!(base_url = %config.api.base_url, "Configuration loaded");

    let app = AppContext::from_config(config)?;
    let mut events = app.session.subscribe();

    let needs_session = cli.command.needs_session();
    if needs_session {
        app.session.restore().await;
        if !app.session.is_authenticated() {
            anyhow::bail!("Not signed in. Run `taskdeck login` first.");
        }
    }

    let result = run(&app, cli.command).await;

    if session_expired(needs_session, &mut events) {
        eprintln!("Your session has expired. Run `taskdeck login` to sign in again.");
    }

    result
}

/// Drains `events` and reports whether a signed-in command lost its session
///
/// A 401 from login or register is a bad password, not an expired session.
fn session_expired(needs_session: bool, events: &mut broadcast::Receiver<SessionEvent>) -> bool {
    let mut evicted = false;
    while let Ok(event) = events.try_recv() {
        evicted |= event == SessionEvent::LoginRequired;
    }
    needs_session && evicted
}

async fn run(app: &AppContext, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Login { email, password } => {
            let user = app
                .session
                .login(&LoginCredentials { email, password })
                .await?;
            println!("Signed in as {} <{}>", user.name, user.email);
        }

        Command::Register {
            name,
            email,
            password,
            confirm_password,
        } => {
            let form = RegistrationForm {
                name,
                email,
                password,
                confirm_password,
            };
            let user = app.session.register_form(form).await?;
            println!("Account created. Signed in as {} <{}>", user.name, user.email);
        }

        Command::Logout => {
            app.session.logout()?;
            println!("Signed out");
        }

        Command::Whoami => {
            if let Some(user) = app.session.current_user() {
                println!("{} <{}> ({})", user.name, user.email, user.role);
            }
        }

        Command::List {
            status,
            priority,
            page,
        } => {
            app.tasks.fetch(page, TaskFilter { status, priority }).await;
            if let Some(message) = app.tasks.error() {
                anyhow::bail!(message);
            }

            let tasks = app.tasks.tasks();
            if tasks.is_empty() {
                println!("No tasks");
            }
            for task in &tasks {
                print_task_line(task);
            }
            println!(
                "Page {} of {} ({} tasks)",
                app.tasks.current_page(),
                app.tasks.total_pages(),
                app.tasks.total()
            );
        }

        Command::Show { id } => {
            let task = app.tasks.get(&id).await?;
            print_task(&task);
        }

        Command::Add {
            title,
            description,
            status,
            priority,
            due,
            tags,
        } => {
            let draft = TaskDraft {
                title,
                description,
                status,
                priority,
                due_date: due,
                tags: (!tags.is_empty()).then_some(tags),
            };
            let task = app.tasks.create(&draft).await?;
            println!("Created {}", task.id);
        }

        Command::Update {
            id,
            title,
            description,
            status,
            priority,
            due,
            tags,
        } => {
            let patch = TaskPatch {
                title,
                description,
                status,
                priority,
                due_date: due,
                tags: (!tags.is_empty()).then_some(tags),
            };
            if patch.is_empty() {
                anyhow::bail!("Nothing to update");
            }
            let task = app.tasks.update(&id, &patch).await?;
            print_task(&task);
        }

        Command::Done { id } => {
            let task = app
                .tasks
                .update(&id, &TaskPatch::status(TaskStatus::Completed))
                .await?;
            println!("Completed {}", task.title);
        }

        Command::Rm { id } => {
            app.tasks.delete(&id).await?;
            println!("Deleted {}", id);
        }

        Command::Stats => {
            let stats = app.tasks.stats().await?;
            println!("Total: {}", stats.total);
            for status in TaskStatus::ALL {
                println!("  {:<12} {}", status, stats.count_for(status));
            }
        }

        Command::Health => {
            let health = app.gateway.health().await?;
            println!(
                "{} is up{}",
                app.gateway.base_url(),
                health
                    .message
                    .map(|m| format!(": {}", m))
                    .unwrap_or_default()
            );
        }
    }

    Ok(())
}

fn print_task_line(task: &Task) {
    let overdue = if task.is_overdue(Utc::now()) { " (overdue)" } else { "" };
    println!(
        "{}  [{:<11}] {:<6}  {}{}",
        task.id, task.status, task.priority, task.title, overdue
    );
}

fn print_task(task: &Task) {
    println!("{}", task.title);
    println!("  id:       {}", task.id);
    println!("  status:   {}", task.status);
    println!("  priority: {}", task.priority);
    if let Some(description) = &task.description {
        println!("  details:  {}", description);
    }
    if let Some(due) = task.due_date {
        println!("  due:      {}", due.to_rfc3339());
    }
    if let Some(tags) = task.tags.as_deref().filter(|t| !t.is_empty()) {
        println!("  tags:     {}", tags.join(", "));
    }
    if let Some(completed) = task.completed_at {
        println!("  done at:  {}", completed.to_rfc3339());
    }
}
