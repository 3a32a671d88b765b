//! Client-side validation helpers
//!
//! Forms are validated with `validator` derives before any request is built.
//! This module flattens `validator`'s nested error map into a stable, ordered
//! list suitable for display.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

/// One failed validation rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Flattens `errors`, sorted by field name
pub fn collect_details(errors: &ValidationErrors) -> Vec<ValidationErrorDetail> {
    let mut details: Vec<ValidationErrorDetail> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| ValidationErrorDetail {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field)),
            })
        })
        .collect();

    details.sort_by(|a, b| a.field.cmp(&b.field));
    details
}

/// Runs `value.validate()` and converts failures into details
pub fn check<T: Validate>(value: &T) -> Result<(), Vec<ValidationErrorDetail>> {
    value.validate().map_err(|e| collect_details(&e))
}
