//! # NetBox product plugin
//!
//! Tenant-scoped site and device inventory mounted at `/api/netbox`.
//! Records live in the tenant session handed out by the platform, so a
//! request can only ever see the inventory of the tenant it arrived for.
//! Writes are permission-checked and announced on the event bus
//! (`site.created`, `site.deleted`, `device.created`, `device.deleted`).
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use semver::Version;

use netplat_core::config::ConfigData;
use netplat_core::plugin_system::{HealthReport, Plugin, PluginContext, PluginMetadata, PluginSystemError};

pub mod models;
mod routes;

pub use models::{Device, DeviceCreate, Site, SiteCreate};

use routes::NetboxState;

pub const PLUGIN_NAME: &str = "netbox";

/// Session collection holding [`Site`] records
pub const SITES: &str = "sites";
/// Session collection holding [`Device`] records
pub const DEVICES: &str = "devices";

pub struct NetBoxPlugin {
    publish_events: bool,
    state: Option<NetboxState>,
}

impl NetBoxPlugin {
    pub fn new(publish_events: bool) -> Self {
        Self {
            publish_events,
            state: None,
        }
    }
}

impl Default for NetBoxPlugin {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl Plugin for NetBoxPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new(PLUGIN_NAME, Version::new(1, 0, 0))
            .with_description("IP Address Management and Data Center Infrastructure")
            .with_author("Network Platform Team")
            .capabilities(["ipam", "dcim"])
    }

    async fn initialize(&mut self, ctx: &PluginContext) -> Result<(), PluginSystemError> {
        log::info!("Initializing NetBox plugin");
        self.state = Some(NetboxState {
            sessions: Arc::clone(&ctx.sessions),
            events: Arc::clone(&ctx.events),
            permissions: Arc::clone(&ctx.permissions),
            publish_events: self.publish_events,
            inventory_writes: Arc::default(),
        });
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), PluginSystemError> {
        log::info!("Shutting down NetBox plugin");
        self.state = None;
        Ok(())
    }

    fn router(&self) -> Option<Router> {
        self.state.clone().map(routes::router)
    }

    async fn health_check(&self) -> HealthReport {
        if self.state.is_some() {
            HealthReport::healthy()
        } else {
            HealthReport::unhealthy("not initialized")
        }
    }
}

/// Catalog constructor. Recognized settings: `publish_events` (bool, default true).
pub fn create_plugin(config: &ConfigData) -> Result<Box<dyn Plugin>, PluginSystemError> {
    let publish_events = config
        .try_get_or("publish_events", true)
        .map_err(|e| PluginSystemError::config(PLUGIN_NAME, e))?;
    Ok(Box::new(NetBoxPlugin::new(publish_events)))
}
