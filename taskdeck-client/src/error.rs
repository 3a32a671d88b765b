//! Error handling for the client
//!
//! [`ClientError`] is what the gateway and the state managers produce.
//! Interactive operations wrap it in an [`OperationError`] that also carries
//! the message meant for display, so callers can branch on the result (keep a
//! form open, show the message) without inspecting the cause.
//!
//! # Taxonomy
//!
//! | Variant        | Origin                                          |
//! |----------------|-------------------------------------------------|
//! | `Transport`    | no response received (connect, timeout, ...)    |
//! | `Unauthorized` | HTTP 401; the session has already been evicted  |
//! | `Api`          | any other non-2xx status                        |
//! | `Rejected`     | 2xx with `success: false`                       |
//! | `Decode`       | response body did not match the expected shape  |
//! | `Validation`   | local pre-validation; never reached the network |
//! | `Storage`      | persisted session could not be read or written  |
//! | `Config`       | invalid client configuration                    |

use taskdeck_shared::storage::StorageError;
use taskdeck_shared::validation::ValidationErrorDetail;
use thiserror::Error;

/// Client result type alias
pub type ClientResult<T> = Result<T, ClientError>;

/// Unified client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// No response was received
    #[error("Request failed: {0}")]
    Transport(String),

    /// Server answered 401
    #[error("Unauthorized: {}", .message.as_deref().unwrap_or("authentication required"))]
    Unauthorized { message: Option<String> },

    /// Server answered with a non-2xx status other than 401
    #[error("Request failed with status {status}{}", .message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default())]
    Api { status: u16, message: Option<String> },

    /// Server answered 2xx but reported `success: false`
    #[error("Request rejected by server{}", .message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default())]
    Rejected { message: Option<String> },

    /// Response body could not be decoded
    #[error("Invalid response: {0}")]
    Decode(String),

    /// Local pre-validation failed
    #[error("Validation failed: {} errors", .0.len())]
    Validation(Vec<ValidationErrorDetail>),

    /// Persisted session storage failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// HTTP status of the response, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Unauthorized { .. } => Some(401),
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message supplied by the server, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Unauthorized { message }
            | ClientError::Api { message, .. }
            | ClientError::Rejected { message } => message.as_deref(),
            _ => None,
        }
    }

    /// Human-readable message for display
    ///
    /// Prefers the server's message; validation failures show their first
    /// rule; everything else falls back to `fallback`.
    pub fn display_message(&self, fallback: &str) -> String {
        if let Some(message) = self.server_message().filter(|m| !m.trim().is_empty()) {
            return message.to_string();
        }
        match self {
            ClientError::Validation(details) => details
                .first()
                .map(|d| d.message.clone())
                .unwrap_or_else(|| fallback.to_string()),
            _ => fallback.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }
}

/// Convert reqwest errors to client errors
impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

/// Failure of an interactive operation (login, create, ...)
///
/// `Display` is the message to show the user.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct OperationError {
    /// Message for display
    pub message: String,

    /// Underlying cause
    #[source]
    pub cause: ClientError,
}

impl OperationError {
    /// Wraps `cause`, deriving the display message with `fallback`
    pub fn new(cause: ClientError, fallback: &str) -> Self {
        Self {
            message: cause.display_message(fallback),
            cause,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.cause.status()
    }

    pub fn is_validation(&self) -> bool {
        self.cause.is_validation()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.cause.is_unauthorized()
    }
}

/// Operation result type alias
pub type OperationResult<T> = Result<T, OperationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::Api {
            status: 404,
            message: Some("Task not found".to_string()),
        };
        assert_eq!(err.to_string(), "Request failed with status 404: Task not found");

        let err = ClientError::Api {
            status: 500,
            message: None,
        };
        assert_eq!(err.to_string(), "Request failed with status 500");

        let err = ClientError::Unauthorized { message: None };
        assert_eq!(err.to_string(), "Unauthorized: authentication required");
    }

    #[test]
    fn test_display_message_prefers_server_message() {
        let err = ClientError::Api {
            status: 400,
            message: Some("Email already registered".to_string()),
        };
        assert_eq!(err.display_message("Failed to register"), "Email already registered");
    }

    #[test]
    fn test_display_message_falls_back() {
        let err = ClientError::Transport("connection refused".to_string());
        assert_eq!(err.display_message("Failed to log in"), "Failed to log in");

        let err = ClientError::Api {
            status: 500,
            message: Some("   ".to_string()),
        };
        assert_eq!(err.display_message("Failed to fetch tasks"), "Failed to fetch tasks");
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![
            ValidationErrorDetail {
                field: "confirm_password".to_string(),
                message: "Passwords do not match".to_string(),
            },
            ValidationErrorDetail {
                field: "password".to_string(),
                message: "Password must be at least 6 characters".to_string(),
            },
        ];

        let err = ClientError::Validation(errors);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
        assert_eq!(err.display_message("Failed to register"), "Passwords do not match");
        assert!(err.status().is_none());
    }

    #[test]
    fn test_operation_error_carries_display_message() {
        let err = OperationError::new(
            ClientError::Unauthorized {
                message: Some("Invalid credentials".to_string()),
            },
            "Failed to log in",
        );

        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(err.status(), Some(401));
        assert!(err.is_unauthorized());
        assert!(!err.is_validation());
    }
}
