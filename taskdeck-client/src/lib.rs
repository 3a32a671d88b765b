//! # Taskdeck Client Library
//!
//! Client for the Taskdeck task-management API: an authenticated HTTP
//! gateway plus the session and task-list state a front end renders.
//!
//! ## Modules
//!
//! - `app`: Wiring of the gateway, session manager and task store
//! - `config`: Configuration management
//! - `error`: Error types and display messages
//! - `gateway`: Outbound HTTP with bearer auth and 401 eviction
//! - `session`: Current user, login/registration, session restore
//! - `tasks`: Paginated task list with server-confirmed mutations

pub mod app;
pub mod config;
pub mod error;
pub mod gateway;
pub mod session;
pub mod tasks;
