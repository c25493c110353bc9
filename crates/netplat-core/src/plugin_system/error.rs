//! # Netplat Core Plugin System Errors
//!
//! [`PluginSystemError`] covers every failure the registry, resolver and
//! discovery can report. Which of them halt startup is decided by the
//! caller: initialization errors always do, registration, discovery and
//! shutdown errors are collected and logged.
use std::path::PathBuf;

use crate::plugin_system::dependency::DependencyError;

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    #[error("Plugin registration error for '{plugin_id}': {message}")]
    RegistrationError { plugin_id: String, message: String },

    #[error("Plugin initialization error for '{plugin_id}': {message}")]
    InitializationError { plugin_id: String, message: String },

    #[error("Plugin '{plugin_id}' did not finish initializing within {timeout_secs}s")]
    InitializationTimeout { plugin_id: String, timeout_secs: u64 },

    #[error("Plugin '{plugin_id}' panicked during {operation}: {message}")]
    Panicked {
        plugin_id: String,
        operation: &'static str,
        message: String,
    },

    #[error("Invalid configuration for plugin '{plugin_id}': {message}")]
    ConfigurationError { plugin_id: String, message: String },

    #[error("Plugin shutdown error for '{plugin_id}': {message}")]
    ShutdownError { plugin_id: String, message: String },

    #[error("Dependency resolution failed: {0}")]
    DependencyResolution(#[from] DependencyError),

    #[error("Plugin discovery failed for candidate '{candidate}': {message}")]
    DiscoveryError { candidate: String, message: String },

    #[error("Plugin manifest error for '{path}': {message}")]
    ManifestError { path: PathBuf, message: String },

    #[error("Plugin not found: {0}")]
    NotFound(String),

    #[error("Tenant hook '{hook}' failed in plugin '{plugin_id}': {message}")]
    TenantHookError {
        plugin_id: String,
        hook: &'static str,
        message: String,
    },

    #[error("Operation error in plugin '{plugin_id}': {message}", plugin_id = .plugin_id.as_deref().unwrap_or("<unknown>"))]
    OperationError {
        plugin_id: Option<String>,
        message: String,
    },
}

impl PluginSystemError {
    /// Name of the plugin the error is attributed to, if any
    pub fn plugin_id(&self) -> Option<&str> {
        match self {
            Self::RegistrationError { plugin_id, .. }
            | Self::InitializationError { plugin_id, .. }
            | Self::ConfigurationError { plugin_id, .. }
            | Self::InitializationTimeout { plugin_id, .. }
            | Self::Panicked { plugin_id, .. }
            | Self::ShutdownError { plugin_id, .. }
            | Self::TenantHookError { plugin_id, .. } => Some(plugin_id),
            Self::OperationError { plugin_id, .. } => plugin_id.as_deref(),
            Self::NotFound(name) => Some(name),
            Self::DependencyResolution(_) | Self::DiscoveryError { .. } | Self::ManifestError { .. } => None,
        }
    }

    /// Convenience constructor for plugin code reporting a failed initialize
    pub fn init(plugin_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InitializationError {
            plugin_id: plugin_id.into(),
            message: message.into(),
        }
    }

    /// Constructor-time rejection of a plugin's settings
    pub fn config(plugin_id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ConfigurationError {
            plugin_id: plugin_id.into(),
            message: reason.to_string(),
        }
    }
}

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
