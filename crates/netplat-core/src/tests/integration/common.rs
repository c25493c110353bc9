#![cfg(test)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, OnceLock};

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use semver::Version;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::api::ApiError;
use crate::config::{ConfigData, PlatformConfig};
use crate::plugin_system::{
    HealthReport, Plugin, PluginCatalog, PluginContext, PluginMetadata, PluginSystemError,
};
use crate::services::{GraphNode, GraphProvider, SessionProvider};
use crate::tenant::{TenantContext, TenantId};

pub type Tracker = Arc<StdMutex<Vec<String>>>;

// Constructors are plain fn pointers, so each test hands its tracker to the
// plugins through a key in their configuration.
static TRACKERS: OnceLock<StdMutex<HashMap<String, Tracker>>> = OnceLock::new();

pub fn new_tracker() -> (String, Tracker) {
    let id = uuid::Uuid::new_v4().to_string();
    let tracker: Tracker = Arc::new(StdMutex::new(Vec::new()));
    TRACKERS
        .get_or_init(Default::default)
        .lock()
        .unwrap()
        .insert(id.clone(), Arc::clone(&tracker));
    (id, tracker)
}

fn tracker_from(config: &ConfigData) -> Tracker {
    config
        .try_get::<String>("tracker")
        .ok()
        .flatten()
        .and_then(|id| TRACKERS.get_or_init(Default::default).lock().unwrap().get(&id).cloned())
        .unwrap_or_default()
}

pub fn recorded(tracker: &Tracker) -> Vec<String> {
    tracker.lock().unwrap().clone()
}

fn record(tracker: &Tracker, event: &str, plugin: &str) {
    tracker.lock().unwrap().push(format!("{}:{}", event, plugin));
}

// ===== MOCK PLUGINS =====

#[derive(Clone)]
struct InventoryState {
    sessions: Arc<dyn SessionProvider>,
    tracker: Tracker,
}

/// Site inventory backed by the tenant session, mounted as `netbox`
pub struct InventoryPlugin {
    tracker: Tracker,
    fail_init: bool,
    state: Option<InventoryState>,
}

#[async_trait]
impl Plugin for InventoryPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("netbox", Version::new(1, 0, 0))
            .with_description("site inventory")
            .capabilities(["ipam", "dcim"])
    }

    async fn initialize(&mut self, ctx: &PluginContext) -> Result<(), PluginSystemError> {
        record(&self.tracker, "init", "netbox");
        if self.fail_init {
            return Err(PluginSystemError::init("netbox", "inventory backend refused connection"));
        }
        self.state = Some(InventoryState {
            sessions: Arc::clone(&ctx.sessions),
            tracker: Arc::clone(&self.tracker),
        });
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), PluginSystemError> {
        record(&self.tracker, "shutdown", "netbox");
        self.state = None;
        Ok(())
    }

    fn router(&self) -> Option<Router> {
        let state = self.state.clone()?;
        Some(
            Router::new()
                .route("/sites", get(list_sites).post(create_site))
                .with_state(state),
        )
    }

    async fn health_check(&self) -> HealthReport {
        HealthReport::healthy()
    }

    async fn on_tenant_created(&self, _tenant: TenantId) -> Result<(), PluginSystemError> {
        record(&self.tracker, "tenant_created", "netbox");
        Ok(())
    }
}

async fn list_sites(
    State(state): State<InventoryState>,
    tenant: TenantContext,
) -> Result<Json<Vec<Value>>, ApiError> {
    record(&state.tracker, "handler", "netbox");
    let session = state.sessions.acquire(tenant.tenant_id).await?;
    Ok(Json(session.list("sites").await?))
}

async fn create_site(
    State(state): State<InventoryState>,
    tenant: TenantContext,
    Json(site): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    record(&state.tracker, "handler", "netbox");
    let id = site["id"]
        .as_str()
        .ok_or_else(|| ApiError::bad_request("site id required"))?
        .to_string();
    let session = state.sessions.acquire(tenant.tenant_id).await?;
    session.insert("sites", &id, site.clone()).await?;
    Ok((StatusCode::CREATED, Json(site)))
}

#[derive(Clone)]
struct SyncState {
    sessions: Arc<dyn SessionProvider>,
    graph: Arc<dyn GraphProvider>,
}

/// Copies inventory sites into the graph store, mounted as `cartography`
pub struct GraphSyncPlugin {
    tracker: Tracker,
    fail_init: bool,
    state: Option<SyncState>,
}

#[async_trait]
impl Plugin for GraphSyncPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("cartography", Version::new(1, 0, 0))
            .requires(["netbox"])
            .capabilities(["graph_synchronization"])
    }

    async fn initialize(&mut self, ctx: &PluginContext) -> Result<(), PluginSystemError> {
        record(&self.tracker, "init", "cartography");
        if self.fail_init {
            return Err(PluginSystemError::init("cartography", "graph store schema missing"));
        }
        self.state = Some(SyncState {
            sessions: Arc::clone(&ctx.sessions),
            graph: Arc::clone(&ctx.graph),
        });
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), PluginSystemError> {
        record(&self.tracker, "shutdown", "cartography");
        self.state = None;
        Ok(())
    }

    fn router(&self) -> Option<Router> {
        let state = self.state.clone()?;
        Some(Router::new().route("/sync", post(sync_sites)).with_state(state))
    }

    async fn health_check(&self) -> HealthReport {
        match &self.state {
            Some(state) => match state.graph.ping().await {
                Ok(()) => HealthReport::healthy(),
                Err(e) => HealthReport::unhealthy(e.to_string()),
            },
            None => HealthReport::unhealthy("not initialized"),
        }
    }
}

async fn sync_sites(
    State(state): State<SyncState>,
    tenant: TenantContext,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let sites = state.sessions.acquire(tenant.tenant_id).await?.list("sites").await?;
    let graph = state.graph.session(tenant.tenant_id).await?;
    for site in &sites {
        if let Some(id) = site["id"].as_str() {
            graph.merge_node(GraphNode::new(id, "Site")).await?;
        }
    }
    Ok((StatusCode::ACCEPTED, Json(json!({ "synced": sites.len() }))))
}

pub fn create_netbox(config: &ConfigData) -> Result<Box<dyn Plugin>, PluginSystemError> {
    Ok(Box::new(InventoryPlugin {
        tracker: tracker_from(config),
        fail_init: config.try_get_or("fail_init", false).map_err(|e| PluginSystemError::config("netbox", e))?,
        state: None,
    }))
}

pub fn create_cartography(config: &ConfigData) -> Result<Box<dyn Plugin>, PluginSystemError> {
    Ok(Box::new(GraphSyncPlugin {
        tracker: tracker_from(config),
        fail_init: config.try_get_or("fail_init", false).map_err(|e| PluginSystemError::config("cartography", e))?,
        state: None,
    }))
}

/// Dependent listed first so the resolver has to reorder
pub fn catalog() -> PluginCatalog {
    PluginCatalog::new()
        .with("cartography", create_cartography)
        .with("netbox", create_netbox)
}

/// Platform config routing both plugins to `tracker_id`
pub fn config_with_tracker(tracker_id: &str) -> PlatformConfig {
    let mut config = PlatformConfig::default();
    for name in ["netbox", "cartography"] {
        let mut data = ConfigData::new();
        data.set("tracker", tracker_id).unwrap();
        config.plugins.settings.insert(name.to_string(), data);
    }
    config
}

pub const TENANT_A: &str = "3f2b8c1e-9d4a-4e6b-8f0c-1a2b3c4d5e6f";
pub const TENANT_B: &str = "7a6b5c4d-3e2f-4a1b-9c8d-7e6f5a4b3c2d";

/// Send one request through the router and decode the JSON body
pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}
