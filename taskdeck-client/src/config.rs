//! Configuration management for the client
//!
//! This module loads configuration from environment variables (and a `.env`
//! file when present) into a type-safe configuration struct.
//!
//! # Environment Variables
//!
//! - `TASKDECK_API_URL`: Base URL of the remote API (default: `http://localhost:3000/api`)
//! - `TASKDECK_TIMEOUT_SECS`: Per-request timeout in seconds (default: 30)
//! - `TASKDECK_SESSION_FILE`: Where the session is persisted
//!   (default: `<config dir>/taskdeck/session.json`)
//! - `RUST_LOG`: Log filter for the binary (default: `taskdeck=info`)
//!
//! # Example
//!
//! ```no_run
//! use taskdeck_client::config::ClientConfig;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = ClientConfig::from_env()?;
//! println!("Talking to {}", config.api.base_url);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Default API base URL
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Complete client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Remote API configuration
    pub api: ApiConfig,

    /// Session persistence configuration
    pub storage: StorageConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every request path is appended to
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Session persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding the persisted token and user
    pub session_file: PathBuf,
}

impl ClientConfig {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `TASKDECK_API_URL` is not an http(s) URL
    /// - `TASKDECK_TIMEOUT_SECS` is not a positive integer
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let base_url = env::var("TASKDECK_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let timeout_secs = env::var("TASKDECK_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()?;

        let session_file = env::var("TASKDECK_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_session_file());

        let config = Self {
            api: ApiConfig {
                base_url,
                timeout_secs,
            },
            storage: StorageConfig { session_file },
        };
        config.validate()?;

        Ok(config)
    }

    /// Configuration pointing at `base_url` with default settings otherwise
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                base_url: base_url.into(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            },
            storage: StorageConfig {
                session_file: default_session_file(),
            },
        }
    }

    /// Checks values that cannot be expressed in the types
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = self.api.base_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("TASKDECK_API_URL must start with http:// or https:// (got '{}')", url);
        }

        if self.api.timeout_secs == 0 {
            anyhow::bail!("TASKDECK_TIMEOUT_SECS must be greater than zero");
        }

        Ok(())
    }

    /// Full URL for an API path such as `/tasks`
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn default_session_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskdeck")
        .join("session.json")
}
