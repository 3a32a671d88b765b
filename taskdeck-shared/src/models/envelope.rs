//! Response envelopes used by every endpoint of the remote API
//!
//! ```text
//! success:    { "success": true,  "data": ..., "message"?: "..." }
//! paginated:  { "success": true,  "data": [...], "pagination": {...} }
//! failure:    { "success": false, "message": "..." }
//! ```

use serde::{Deserialize, Serialize};

use super::user::AuthPayload;

/// Standard single-resource envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,

    /// Absent on outcome-only responses
    pub data: Option<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }
}

/// Envelope returned by login and registration
pub type AuthResponse = ApiResponse<AuthPayload>;

/// Envelope for endpoints that only report an outcome, e.g. `DELETE /tasks/:id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,

    #[serde(default)]
    pub message: Option<String>,
}

/// Page metadata of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// 1-based page number
    pub page: u32,

    /// Page size used by the server
    pub limit: u32,

    /// Total matching records
    pub total: u64,

    /// Total number of pages
    pub pages: u32,
}

impl Pagination {
    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Envelope of a paginated listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub success: bool,

    #[serde(default = "Vec::new")]
    pub data: Vec<T>,

    pub pagination: Pagination,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Error body sent with non-2xx responses
///
/// Every field is optional; servers do not always include a message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub success: Option<bool>,

    #[serde(default)]
    pub message: Option<String>,
}
