//! Wire models shared by the client and its tests
//!
//! # Models
//!
//! - `user`: user identity, credentials and registration form
//! - `task`: tasks, drafts, patches, filters and statistics
//! - `envelope`: `{success, data, ...}` response wrappers

pub mod envelope;
pub mod task;
pub mod user;

pub use envelope::{
    ApiResponse, AuthResponse, ErrorBody, MessageResponse, PaginatedResponse, Pagination,
};
pub use task::{
    ParseEnumError, StatusCount, Task, TaskDraft, TaskFilter, TaskPatch, TaskPriority,
    TaskStats, TaskStatus,
};
pub use user::{
    AuthPayload, LoginCredentials, RegisterData, RegistrationForm, User, UserRole, UserUpdate,
};
