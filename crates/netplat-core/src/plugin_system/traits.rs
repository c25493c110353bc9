use async_trait::async_trait;
use axum::Router;

use crate::plugin_system::context::PluginContext;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::health::HealthReport;
use crate::plugin_system::metadata::PluginMetadata;
use crate::tenant::TenantId;

/// Core trait that all product plugins must implement.
///
/// The registry owns each instance exclusively and calls `initialize` at
/// most once and `shutdown` at most once per lifecycle.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Descriptor of this plugin. Pure; callable before initialize.
    fn metadata(&self) -> PluginMetadata;

    /// One-time setup against the shared collaborators.
    ///
    /// On error the plugin must already have released anything it acquired.
    async fn initialize(&mut self, ctx: &PluginContext) -> Result<(), PluginSystemError>;

    /// Release everything the plugin owns. Only called after a successful
    /// initialize.
    async fn shutdown(&mut self) -> Result<(), PluginSystemError>;

    /// HTTP surface mounted under `/api/{name}`, `None` before initialize or
    /// if the plugin exposes none
    fn router(&self) -> Option<Router>;

    /// Cheap status probe. Internal failures are reported as an unhealthy
    /// report, never as a panic.
    async fn health_check(&self) -> HealthReport;

    /// Provision tenant-scoped state
    async fn on_tenant_created(&self, _tenant: TenantId) -> Result<(), PluginSystemError> {
        Ok(())
    }

    /// Tear down tenant-scoped state
    async fn on_tenant_deleted(&self, _tenant: TenantId) -> Result<(), PluginSystemError> {
        Ok(())
    }
}
