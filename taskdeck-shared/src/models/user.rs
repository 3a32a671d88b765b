//! User model and authentication payloads
//!
//! The server owns user records; the client only ever holds the copy returned
//! by login, registration or `GET /auth/me`.
//!
//! # Wire format
//!
//! ```json
//! {
//!   "id": "64f1c0...",
//!   "name": "Ada Lovelace",
//!   "email": "ada@example.com",
//!   "role": "user",
//!   "createdAt": "2024-03-01T12:00:00.000Z"
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Role assigned to a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular account
    #[default]
    User,

    /// Administrator
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// User identity record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Server-assigned user ID
    #[serde(alias = "_id")]
    pub id: String,

    /// Display name
    pub name: String,

    /// Email address
    pub email: String,

    /// Account role
    #[serde(default)]
    pub role: UserRole,

    /// When the account was created
    pub created_at: DateTime<Utc>,
}

/// Partial update applied to the locally held user record
///
/// Only `Some` fields are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
}

impl UserUpdate {
    /// Returns true if the update carries no fields
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.role.is_none()
    }
}

impl User {
    /// Merges the set fields of `update` into this record
    pub fn apply(&mut self, update: UserUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(role) = update.role {
            self.role = role;
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Body of `POST /auth/login`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of `POST /auth/register`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterData {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for RegisterData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterData")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Registration form as filled in by the user
///
/// Checked locally before anything is sent; a form that fails validation
/// never reaches the network.
#[derive(Clone, Validate)]
pub struct RegistrationForm {
    #[validate(length(min = 3, message = "Name must be at least 3 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

impl RegistrationForm {
    /// Drops the confirmation field, producing the request body
    pub fn into_register_data(self) -> RegisterData {
        RegisterData {
            name: self.name,
            email: self.email,
            password: self.password,
        }
    }
}

/// `data` payload of a successful login or registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthPayload {
    pub user: User,
    pub token: String,
}
