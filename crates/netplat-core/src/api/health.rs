use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::AppState;
use crate::plugin_system::HealthReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct PlatformHealth {
    pub status: OverallStatus,
    pub plugins: Vec<HealthReport>,
    pub timestamp: DateTime<Utc>,
}

impl PlatformHealth {
    /// Healthy only if every plugin reports healthy
    pub fn from_reports(plugins: Vec<HealthReport>) -> Self {
        let status = if plugins.iter().all(HealthReport::is_healthy) {
            OverallStatus::Healthy
        } else {
            OverallStatus::Degraded
        };
        Self {
            status,
            plugins,
            timestamp: Utc::now(),
        }
    }
}

/// Always answers 200; degradation is reported in the body
pub async fn health(State(state): State<AppState>) -> Json<PlatformHealth> {
    let reports = state.registry.read().await.health_check_all().await;
    Json(PlatformHealth::from_reports(reports))
}
