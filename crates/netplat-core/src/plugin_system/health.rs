use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Result of one plugin's health probe.
///
/// `plugin` and `initialized` are filled in by the registry from its own
/// bookkeeping; whatever the plugin puts there is overwritten.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub plugin: String,
    pub status: HealthStatus,
    pub initialized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

impl HealthReport {
    fn with_status(status: HealthStatus) -> Self {
        Self {
            plugin: String::new(),
            status,
            initialized: false,
            message: None,
            details: Value::Null,
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(HealthStatus::Healthy)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(HealthStatus::Degraded).with_message(message)
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(HealthStatus::Unhealthy).with_message(message)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
