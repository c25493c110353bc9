//! # LibreNMS product plugin
//!
//! SNMP monitoring mounted at `/api/librenms`. Each tenant gets a poller
//! when the platform announces the tenant and loses it (with its monitored
//! devices) when the tenant is deleted; device routes answer 409 for a
//! tenant that was never provisioned.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use semver::Version;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use netplat_core::config::ConfigData;
use netplat_core::plugin_system::{HealthReport, Plugin, PluginContext, PluginMetadata, PluginSystemError};
use netplat_core::services::SessionProvider;
use netplat_core::tenant::TenantId;

mod routes;

pub const PLUGIN_NAME: &str = "librenms";
/// Session collection holding [`MonitoredDevice`] records
pub const DEVICES: &str = "librenms_devices";

/// Poller bookkeeping for one tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollerState {
    pub interval_secs: u64,
    pub community: String,
    pub polls: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Pending,
    Up,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredDevice {
    pub hostname: String,
    #[serde(default = "default_snmp_version")]
    pub snmp_version: String,
    pub status: DeviceStatus,
}

fn default_snmp_version() -> String {
    "v2c".to_string()
}

type Pollers = Arc<RwLock<HashMap<TenantId, PollerState>>>;

#[derive(Clone)]
pub(crate) struct MonitorState {
    pub sessions: Arc<dyn SessionProvider>,
    pub pollers: Pollers,
}

pub struct LibreNmsPlugin {
    interval_secs: u64,
    community: String,
    pollers: Pollers,
    state: Option<MonitorState>,
}

impl LibreNmsPlugin {
    pub fn new(interval_secs: u64, community: impl Into<String>) -> Self {
        Self {
            interval_secs,
            community: community.into(),
            pollers: Arc::default(),
            state: None,
        }
    }

    /// Poller of a provisioned tenant
    pub async fn poller(&self, tenant: TenantId) -> Option<PollerState> {
        self.pollers.read().await.get(&tenant).cloned()
    }
}

impl Default for LibreNmsPlugin {
    fn default() -> Self {
        Self::new(300, "public")
    }
}

#[async_trait]
impl Plugin for LibreNmsPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new(PLUGIN_NAME, Version::new(1, 0, 0))
            .with_description("LibreNMS integration for SNMP-based monitoring")
            .with_author("Network Platform Team")
            .capabilities(["snmp_monitoring"])
    }

    async fn initialize(&mut self, ctx: &PluginContext) -> Result<(), PluginSystemError> {
        log::info!("Initializing LibreNMS plugin (poll interval {}s)", self.interval_secs);
        self.state = Some(MonitorState {
            sessions: Arc::clone(&ctx.sessions),
            pollers: Arc::clone(&self.pollers),
        });
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), PluginSystemError> {
        let stopped = {
            let mut pollers = self.pollers.write().await;
            let count = pollers.len();
            pollers.clear();
            count
        };
        log::info!("Shutting down LibreNMS plugin, stopped {} pollers", stopped);
        self.state = None;
        Ok(())
    }

    fn router(&self) -> Option<Router> {
        self.state.clone().map(routes::router)
    }

    async fn health_check(&self) -> HealthReport {
        if self.state.is_none() {
            return HealthReport::unhealthy("not initialized");
        }
        let pollers = self.pollers.read().await.len();
        HealthReport::healthy().with_details(serde_json::json!({ "pollers": pollers }))
    }

    async fn on_tenant_created(&self, tenant: TenantId) -> Result<(), PluginSystemError> {
        let poller = PollerState {
            interval_secs: self.interval_secs,
            community: self.community.clone(),
            polls: 0,
        };
        self.pollers.write().await.entry(tenant).or_insert(poller);
        log::info!("[{}] Provisioned LibreNMS poller", tenant);
        Ok(())
    }

    async fn on_tenant_deleted(&self, tenant: TenantId) -> Result<(), PluginSystemError> {
        self.pollers.write().await.remove(&tenant);
        let Some(state) = &self.state else {
            return Ok(());
        };
        let hook_error = |e: netplat_core::services::ServiceError| PluginSystemError::TenantHookError {
            plugin_id: PLUGIN_NAME.to_string(),
            hook: "on_tenant_deleted",
            message: e.to_string(),
        };
        let session = state.sessions.acquire(tenant).await.map_err(hook_error)?;
        for device in session.list(DEVICES).await.map_err(hook_error)? {
            if let Some(hostname) = device["hostname"].as_str() {
                session.delete(DEVICES, hostname).await.map_err(hook_error)?;
            }
        }
        log::info!("[{}] Removed LibreNMS poller and monitored devices", tenant);
        Ok(())
    }
}

/// Catalog constructor. Recognized settings: `poll_interval_secs` (default
/// 300), `community` (default `public`).
pub fn create_plugin(config: &ConfigData) -> Result<Box<dyn Plugin>, PluginSystemError> {
    let interval: u64 = config
        .try_get_or("poll_interval_secs", 300)
        .map_err(|e| PluginSystemError::config(PLUGIN_NAME, e))?;
    let community: String = config
        .try_get_or("community", "public".to_string())
        .map_err(|e| PluginSystemError::config(PLUGIN_NAME, e))?;
    Ok(Box::new(LibreNmsPlugin::new(interval, community)))
}
