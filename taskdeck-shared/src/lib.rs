//! # Taskdeck Shared Library
//!
//! Types and utilities shared by the Taskdeck client library, its binary and
//! its tests.
//!
//! ## Module Organization
//!
//! - `models`: wire models for users, tasks and response envelopes
//! - `storage`: persisted session storage (token + user)
//! - `validation`: client-side form validation helpers

pub mod models;
pub mod storage;
pub mod validation;

/// Current version of the Taskdeck shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
