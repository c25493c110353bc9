use thiserror::Error;

/// Failures reported by shared collaborators
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The provider was closed during platform shutdown
    #[error("{service} has been closed")]
    Closed { service: &'static str },

    #[error("{kind} '{id}' not found")]
    NotFound { kind: String, id: String },

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Backend error: {0}")]
    Backend(String),
}
