//! # Netplat Core HTTP Surface
//!
//! Platform-owned routes and the shared error body. Plugin routes are
//! mounted by the application composer, not here.
//!
//! - **[`error`]**: [`ApiError`], rendered as `{"detail": "..."}`.
//! - **[`health`]**: `GET /health`, the aggregated plugin health report.
//! - **[`tenants`]**: `POST`/`DELETE /platform/tenants/{tenant_id}`, driving
//!   the plugins' tenant lifecycle hooks.
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::sync::RwLock;

use crate::plugin_system::{PluginContext, PluginRegistry};
use crate::tenant::TenantPolicy;

pub mod error;
pub mod health;
pub mod tenants;

pub use error::ApiError;
pub use health::{OverallStatus, PlatformHealth};

/// State shared by the platform-owned handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RwLock<PluginRegistry>>,
    pub services: PluginContext,
    pub tenant_policy: TenantPolicy,
}

/// Routes owned by the platform itself
pub fn platform_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/platform/tenants/:tenant_id",
            post(tenants::create_tenant).delete(tenants::delete_tenant),
        )
        .with_state(state)
}
