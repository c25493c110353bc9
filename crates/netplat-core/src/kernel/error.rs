//! # Netplat Core Kernel Errors
//!
//! [`Error`] is the top-level error of the platform process. Subsystem
//! errors convert into it with `?`; failures of a whole startup or shutdown
//! step are wrapped in [`Error::KernelLifecycleError`] tagged with the
//! [`KernelLifecyclePhase`] they happened in.
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::config::ConfigError;
use crate::plugin_system::error::PluginSystemError;
use crate::services::ServiceError;

#[derive(Debug, ThisError)]
pub enum Error {
    /// Specific, typed plugin system error
    #[error("Plugin system error: {0}")]
    PluginSystem(#[from] PluginSystemError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("I/O error during '{operation}': {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Error occurring during a specific kernel lifecycle phase.
    #[error("Kernel lifecycle error during {phase}: {message}")]
    KernelLifecycleError {
        phase: KernelLifecyclePhase,
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Represents a specific phase in the platform lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum KernelLifecyclePhase {
    #[error("Discover")]
    Discover,
    #[error("Initialize")]
    Initialize,
    #[error("Serve")]
    Serve,
    #[error("Shutdown")]
    Shutdown,
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl Error {
    pub fn io(source: std::io::Error, operation: impl Into<String>) -> Self {
        Error::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn lifecycle(
        phase: KernelLifecyclePhase,
        message: impl Into<String>,
        source: Option<Error>,
    ) -> Self {
        Error::KernelLifecycleError {
            phase,
            message: message.into(),
            source: source.map(Box::new),
        }
    }

    /// Phase of a lifecycle error, `None` for every other variant
    pub fn phase(&self) -> Option<KernelLifecyclePhase> {
        match self {
            Error::KernelLifecycleError { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
