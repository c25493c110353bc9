use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::error::ApiError;

/// Reasons a request is rejected at the tenant boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TenantError {
    /// No tenant header on a path that requires isolation
    #[error("Tenant ID required")]
    Missing,

    /// Header present but not a valid tenant identifier
    #[error("Invalid Tenant ID format: '{value}' ({reason})")]
    Malformed { value: String, reason: String },
}

impl IntoResponse for TenantError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
