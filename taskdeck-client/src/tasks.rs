//! Task collection store
//!
//! Holds one page of the signed-in user's tasks plus the page number, filter
//! and pagination metadata that produced it. Mutations go to the server
//! first; the local list only changes after the server confirms.
//!
//! | Operation | Request                 | Local effect on success             |
//! |-----------|-------------------------|-------------------------------------|
//! | `fetch`   | `GET /tasks?...`        | replace list, query and pagination  |
//! | `create`  | `POST /tasks`           | refetch the current page and filter |
//! | `update`  | `PUT /tasks/:id`        | replace the matching entry in place |
//! | `delete`  | `DELETE /tasks/:id`     | remove the entry with that id       |
//! | `get`     | `GET /tasks/:id`        | replace the matching entry in place |
//! | `stats`   | `GET /tasks/stats`      | none                                |
//!
//! # Overlapping fetches
//!
//! Every fetch takes a sequence number when it starts. When a response
//! arrives after a newer fetch has started, it is dropped, so the list
//! always reflects the most recently requested page and filter.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use taskdeck_shared::models::{
    ApiResponse, MessageResponse, PaginatedResponse, Pagination, Task, TaskDraft, TaskFilter,
    TaskPatch, TaskPriority, TaskStats, TaskStatus,
};
use taskdeck_shared::validation::{self, ValidationErrorDetail};

use crate::error::{ClientError, ClientResult, OperationError, OperationResult};
use crate::gateway::{expect_data, Gateway};

/// Tasks requested per page
pub const PAGE_SIZE: u32 = 10;

pub const FETCH_FAILED: &str = "Failed to fetch tasks";
pub const CREATE_FAILED: &str = "Failed to create task";
pub const UPDATE_FAILED: &str = "Failed to update task";
pub const DELETE_FAILED: &str = "Failed to delete task";
pub const GET_FAILED: &str = "Failed to load task";
pub const STATS_FAILED: &str = "Failed to load task statistics";

/// Page and filter of the current listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskQuery {
    /// 1-based page number
    pub page: u32,
    pub filter: TaskFilter,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            page: 1,
            filter: TaskFilter::default(),
        }
    }
}

/// Point-in-time copy of the store's state
#[derive(Debug, Clone, Default)]
pub struct TaskListSnapshot {
    pub tasks: Vec<Task>,
    pub loading: bool,
    pub error: Option<String>,
    pub query: TaskQuery,
    pub pagination: Option<Pagination>,
}

#[derive(Serialize)]
struct ListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<TaskPriority>,
    page: u32,
    limit: u32,
}

impl ListParams {
    fn new(query: TaskQuery) -> Self {
        Self {
            status: query.filter.status,
            priority: query.filter.priority,
            page: query.page,
            limit: PAGE_SIZE,
        }
    }
}

struct TaskStoreInner {
    gateway: Gateway,
    state: RwLock<TaskListSnapshot>,
    latest_fetch: AtomicU64,
}

/// Task collection store
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct TaskStore {
    inner: Arc<TaskStoreInner>,
}

impl TaskStore {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            inner: Arc::new(TaskStoreInner {
                gateway,
                state: RwLock::new(TaskListSnapshot::default()),
                latest_fetch: AtomicU64::new(0),
            }),
        }
    }

    /// Loads one page of tasks matching `filter`
    ///
    /// On success the list, page, filter and pagination are replaced
    /// together. On failure the previous list stays and the error message is
    /// recorded. Page numbers below 1 are treated as 1.
    pub async fn fetch(&self, page: u32, filter: TaskFilter) {
        let query = TaskQuery {
            page: page.max(1),
            filter,
        };
        let seq = self.inner.latest_fetch.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(seq, page = query.page, ?filter, "Fetching tasks");
        self.begin();

        let result = self
            .inner
            .gateway
            .get_with_query::<_, PaginatedResponse<Task>>("/tasks", &ListParams::new(query))
            .await
            .and_then(|response| {
                if response.success {
                    Ok(response)
                } else {
                    Err(ClientError::Rejected {
                        message: response.message,
                    })
                }
            });

        if self.inner.latest_fetch.load(Ordering::SeqCst) != seq {
            tracing::debug!(seq, "Dropping superseded task listing");
            return;
        }

        let mut state = self.write();
        match result {
            Ok(response) => {
                tracing::debug!(seq, count = response.data.len(), total = response.pagination.total, "Tasks loaded");
                state.tasks = response.data;
                state.pagination = Some(response.pagination);
                state.query = query;
                state.error = None;
            }
            Err(e) => {
                tracing::warn!(seq, error = %e, "Failed to fetch tasks");
                state.error = Some(e.display_message(FETCH_FAILED));
            }
        }
        state.loading = false;
    }

    /// Fetches again with the current page and filter
    pub async fn refresh(&self) {
        let query = self.query();
        self.fetch(query.page, query.filter).await;
    }

    /// Creates a task, then refetches the current page and filter
    ///
    /// The refetch keeps the list consistent with server-side ordering and
    /// pagination. A failed refetch is recorded like any fetch failure and
    /// does not fail the creation.
    pub async fn create(&self, draft: &TaskDraft) -> OperationResult<Task> {
        if let Err(details) = validation::check(draft) {
            return Err(self.fail(ClientError::Validation(details), CREATE_FAILED));
        }
        self.begin();

        let result = self
            .inner
            .gateway
            .post::<_, ApiResponse<Task>>("/tasks", draft)
            .await
            .and_then(expect_data);

        match result {
            Ok(task) => {
                tracing::info!(task_id = %task.id, "Task created");
                self.refresh().await;
                Ok(task)
            }
            Err(e) => Err(self.fail(e, CREATE_FAILED)),
        }
    }

    /// Applies `patch` to task `id`
    ///
    /// The server's full record replaces the matching local entry in place;
    /// position and list length are unchanged. If the task is not on the
    /// current page nothing local changes.
    pub async fn update(&self, id: &str, patch: &TaskPatch) -> OperationResult<Task> {
        if let Err(details) = validation::check(patch) {
            return Err(self.fail(ClientError::Validation(details), UPDATE_FAILED));
        }
        let path = task_path(id).map_err(|e| self.fail(e, UPDATE_FAILED))?;
        self.begin();

        let result = self
            .inner
            .gateway
            .put::<_, ApiResponse<Task>>(&path, patch)
            .await
            .and_then(expect_data);

        match result {
            Ok(task) => {
                tracing::info!(task_id = %task.id, status = %task.status, "Task updated");
                let mut state = self.write();
                replace_in_place(&mut state.tasks, id, &task);
                state.loading = false;
                Ok(task)
            }
            Err(e) => Err(self.fail(e, UPDATE_FAILED)),
        }
    }

    /// Deletes task `id`
    ///
    /// The local entry is removed only after the server confirms.
    pub async fn delete(&self, id: &str) -> OperationResult<()> {
        let path = task_path(id).map_err(|e| self.fail(e, DELETE_FAILED))?;
        self.begin();

        let result = self
            .inner
            .gateway
            .delete::<MessageResponse>(&path)
            .await
            .and_then(|response| ensure_success(&response));

        match result {
            Ok(()) => {
                tracing::info!(task_id = %id, "Task deleted");
                let mut state = self.write();
                state.tasks.retain(|task| task.id != id);
                state.loading = false;
                Ok(())
            }
            Err(e) => Err(self.fail(e, DELETE_FAILED)),
        }
    }

    /// Loads a single task by id
    ///
    /// If the task is on the current page its entry is refreshed in place.
    pub async fn get(&self, id: &str) -> OperationResult<Task> {
        let path = task_path(id).map_err(|e| self.fail(e, GET_FAILED))?;
        self.begin();

        let result = self
            .inner
            .gateway
            .get::<ApiResponse<Task>>(&path)
            .await
            .and_then(expect_data);

        match result {
            Ok(task) => {
                let mut state = self.write();
                replace_in_place(&mut state.tasks, id, &task);
                state.loading = false;
                Ok(task)
            }
            Err(e) => Err(self.fail(e, GET_FAILED)),
        }
    }

    /// Loads aggregate counts for the signed-in user
    ///
    /// Leaves the listing state untouched.
    pub async fn stats(&self) -> OperationResult<TaskStats> {
        self.inner
            .gateway
            .get::<ApiResponse<TaskStats>>("/tasks/stats")
            .await
            .and_then(expect_data)
            .map_err(|e| {
                tracing::warn!(error = %e, "Failed to load task statistics");
                OperationError::new(e, STATS_FAILED)
            })
    }

    /// Copy of the whole state
    pub fn snapshot(&self) -> TaskListSnapshot {
        self.read().clone()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.read().tasks.clone()
    }

    /// Task `id` if it is on the current page
    pub fn find(&self, id: &str) -> Option<Task> {
        self.read().tasks.iter().find(|task| task.id == id).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    /// Message of the last failure
    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }

    /// Page and filter of the current listing
    pub fn query(&self) -> TaskQuery {
        self.read().query
    }

    pub fn current_page(&self) -> u32 {
        self.read().query.page
    }

    /// Total pages reported by the last successful fetch, at least 1
    pub fn total_pages(&self) -> u32 {
        self.read()
            .pagination
            .map(|p| p.pages.max(1))
            .unwrap_or(1)
    }

    /// Total matching tasks reported by the last successful fetch
    pub fn total(&self) -> u64 {
        self.read().pagination.map(|p| p.total).unwrap_or(0)
    }

    fn read(&self) -> RwLockReadGuard<'_, TaskListSnapshot> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TaskListSnapshot> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) {
        let mut state = self.write();
        state.loading = true;
        state.error = None;
    }

    fn fail(&self, cause: ClientError, fallback: &str) -> OperationError {
        let err = OperationError::new(cause, fallback);
        tracing::warn!(error = %err.cause, "{}", fallback);

        let mut state = self.write();
        state.error = Some(err.message.clone());
        state.loading = false;
        err
    }
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("TaskStore")
            .field("tasks", &state.tasks.len())
            .field("query", &state.query)
            .field("loading", &state.loading)
            .finish_non_exhaustive()
    }
}

/// Path of task `id`
///
/// Ids are opaque server tokens; anything outside `[A-Za-z0-9_-]` could
/// escape the `/tasks/` prefix and is rejected before a request is built.
fn task_path(id: &str) -> ClientResult<String> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(ClientError::Validation(vec![ValidationErrorDetail {
            field: "id".to_string(),
            message: format!("Invalid task id: {:?}", id),
        }]));
    }
    Ok(format!("/tasks/{}", id))
}

fn replace_in_place(tasks: &mut [Task], id: &str, task: &Task) -> bool {
    match tasks.iter_mut().find(|existing| existing.id == id) {
        Some(slot) => {
            *slot = task.clone();
            true
        }
        None => false,
    }
}

/// Fails with [`ClientError::Rejected`] unless `response.success`
fn ensure_success(response: &MessageResponse) -> ClientResult<()> {
    if response.success {
        Ok(())
    } else {
        Err(ClientError::Rejected {
            message: response.message.clone(),
        })
    }
}
