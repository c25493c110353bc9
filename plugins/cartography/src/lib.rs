//! # Cartography product plugin
//!
//! `POST /api/cartography/sync` copies the calling tenant's NetBox sites and
//! devices into its graph: one `Site` node per site, one `Device` node per
//! device and a `LOCATED_AT` edge from each device to its site. Merges are
//! idempotent, so a sync can be repeated.
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use semver::Version;
use serde::Serialize;
use serde_json::Value;

use netplat_core::api::ApiError;
use netplat_core::config::ConfigData;
use netplat_core::plugin_system::{HealthReport, Plugin, PluginContext, PluginMetadata, PluginSystemError};
use netplat_core::services::{GraphEdge, GraphNode, GraphProvider, GraphSession, SessionProvider};
use netplat_core::tenant::{TenantContext, TenantId};
use netplat_netbox::{DEVICES, Device, SITES, Site};

pub const PLUGIN_NAME: &str = "cartography";
pub const LOCATED_AT: &str = "LOCATED_AT";

#[derive(Clone)]
struct SyncState {
    sessions: Arc<dyn SessionProvider>,
    graph: Arc<dyn GraphProvider>,
}

/// Counts of what one sync merged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub sites: usize,
    pub devices: usize,
}

#[derive(Default)]
pub struct CartographyPlugin {
    state: Option<SyncState>,
}

#[async_trait]
impl Plugin for CartographyPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new(PLUGIN_NAME, Version::new(1, 0, 0))
            .with_description("Graph-based network visualization")
            .with_author("Network Platform Team")
            .requires([netplat_netbox::PLUGIN_NAME])
            .capabilities(["graph_synchronization"])
    }

    async fn initialize(&mut self, ctx: &PluginContext) -> Result<(), PluginSystemError> {
        log::info!("Initializing Cartography plugin");
        ctx.graph.ping().await.map_err(|e| {
            PluginSystemError::init(PLUGIN_NAME, format!("graph store unreachable: {}", e))
        })?;
        self.state = Some(SyncState {
            sessions: Arc::clone(&ctx.sessions),
            graph: Arc::clone(&ctx.graph),
        });
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), PluginSystemError> {
        log::info!("Shutting down Cartography plugin");
        self.state = None;
        Ok(())
    }

    fn router(&self) -> Option<Router> {
        let state = self.state.clone()?;
        Some(Router::new().route("/sync", post(sync)).with_state(state))
    }

    async fn health_check(&self) -> HealthReport {
        match &self.state {
            Some(state) => match state.graph.ping().await {
                Ok(()) => HealthReport::healthy(),
                Err(e) => HealthReport::unhealthy(format!("graph store: {}", e)),
            },
            None => HealthReport::unhealthy("not initialized"),
        }
    }
}

async fn sync(State(state): State<SyncState>, tenant: TenantContext) -> Result<(StatusCode, Json<SyncSummary>), ApiError> {
    let summary = sync_tenant(&state, tenant.tenant_id).await?;
    Ok((StatusCode::ACCEPTED, Json(summary)))
}

async fn sync_tenant(state: &SyncState, tenant: TenantId) -> Result<SyncSummary, ApiError> {
    log::info!("[{}] Starting cartography synchronization", tenant);
    let inventory = state.sessions.acquire(tenant).await?;
    let graph = state.graph.session(tenant).await?;

    let sites: Vec<Site> = decode_all(inventory.list(SITES).await?)?;
    for site in &sites {
        merge_site(graph.as_ref(), site).await?;
    }

    let devices: Vec<Device> = decode_all(inventory.list(DEVICES).await?)?;
    for device in &devices {
        merge_device(graph.as_ref(), device).await?;
    }

    log::info!(
        "[{}] Cartography synchronization complete: {} sites, {} devices",
        tenant,
        sites.len(),
        devices.len()
    );
    Ok(SyncSummary {
        sites: sites.len(),
        devices: devices.len(),
    })
}

async fn merge_site(graph: &dyn GraphSession, site: &Site) -> Result<(), ApiError> {
    let node = GraphNode::new(&site.id, "Site")
        .with_property("name", Value::from(site.name.as_str()))
        .with_property("slug", Value::from(site.slug.as_str()));
    graph.merge_node(node).await?;
    Ok(())
}

async fn merge_device(graph: &dyn GraphSession, device: &Device) -> Result<(), ApiError> {
    let mut node = GraphNode::new(&device.id, "Device").with_property("name", Value::from(device.name.as_str()));
    if let Some(role) = &device.device_role {
        node = node.with_property("device_role", Value::from(role.as_str()));
    }
    if let Some(kind) = &device.device_type {
        node = node.with_property("device_type", Value::from(kind.as_str()));
    }
    graph.merge_node(node).await?;
    graph
        .merge_edge(GraphEdge {
            from: device.id.clone(),
            to: device.site_id.clone(),
            relation: LOCATED_AT.to_string(),
        })
        .await?;
    Ok(())
}

fn decode_all<T: serde::de::DeserializeOwned>(documents: Vec<Value>) -> Result<Vec<T>, ApiError> {
    documents
        .into_iter()
        .map(|doc| serde_json::from_value(doc).map_err(|e| ApiError::internal(format!("corrupt inventory record: {}", e))))
        .collect()
}

pub fn create_plugin(_config: &ConfigData) -> Result<Box<dyn Plugin>, PluginSystemError> {
    Ok(Box::new(CartographyPlugin::default()))
}
