//! # Topology product plugin
//!
//! Read and extend the calling tenant's graph through `/api/topology`:
//! `GET /nodes?label=`, `GET /nodes/{id}`, `POST /nodes`, `GET /edges`,
//! `GET /graph`. Listings are capped at the configured `query_limit`.
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use netplat_core::api::ApiError;
use netplat_core::config::ConfigData;
use netplat_core::plugin_system::{HealthReport, Plugin, PluginContext, PluginMetadata, PluginSystemError};
use netplat_core::services::{GraphEdge, GraphNode, GraphProvider, GraphSession, ServiceError};
use netplat_core::tenant::TenantContext;

pub const PLUGIN_NAME: &str = "topology";
pub const DEFAULT_QUERY_LIMIT: usize = 25;

/// Whole-graph view of one tenant
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopologyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Read every node and edge of the session's tenant
pub async fn snapshot(session: &dyn GraphSession) -> Result<TopologyGraph, ServiceError> {
    Ok(TopologyGraph {
        nodes: session.nodes(None).await?,
        edges: session.edges().await?,
    })
}

#[derive(Clone)]
struct TopologyState {
    graph: Arc<dyn GraphProvider>,
    limit: usize,
}

pub struct TopologyPlugin {
    limit: usize,
    state: Option<TopologyState>,
}

impl TopologyPlugin {
    pub fn new(limit: usize) -> Self {
        Self { limit, state: None }
    }
}

impl Default for TopologyPlugin {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY_LIMIT)
    }
}

#[async_trait]
impl Plugin for TopologyPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new(PLUGIN_NAME, Version::new(1, 0, 0))
            .with_description("Graph-based topology visualization and management")
            .with_author("Network Platform Team")
            .capabilities(["topology"])
    }

    async fn initialize(&mut self, ctx: &PluginContext) -> Result<(), PluginSystemError> {
        log::info!("Initializing Topology plugin (query limit {})", self.limit);
        self.state = Some(TopologyState {
            graph: Arc::clone(&ctx.graph),
            limit: self.limit,
        });
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), PluginSystemError> {
        log::info!("Shutting down Topology plugin");
        self.state = None;
        Ok(())
    }

    fn router(&self) -> Option<Router> {
        let state = self.state.clone()?;
        Some(
            Router::new()
                .route("/nodes", get(list_nodes).post(create_node))
                .route("/nodes/:node_id", get(get_node))
                .route("/edges", get(list_edges))
                .route("/graph", get(full_graph))
                .with_state(state),
        )
    }

    async fn health_check(&self) -> HealthReport {
        let Some(state) = &self.state else {
            return HealthReport::unhealthy("not initialized");
        };
        match state.graph.ping().await {
            Ok(()) => HealthReport::healthy(),
            Err(e) => HealthReport::unhealthy(format!("graph store: {}", e)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NodeFilter {
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NodeCreate {
    #[serde(default = "default_label")]
    label: String,
    #[serde(default)]
    properties: Map<String, Value>,
}

fn default_label() -> String {
    "Node".to_string()
}

async fn list_nodes(
    State(state): State<TopologyState>,
    tenant: TenantContext,
    Query(filter): Query<NodeFilter>,
) -> Result<Json<Vec<GraphNode>>, ApiError> {
    let session = state.graph.session(tenant.tenant_id).await?;
    let mut nodes = session.nodes(filter.label.as_deref()).await?;
    nodes.truncate(state.limit);
    Ok(Json(nodes))
}

async fn get_node(
    State(state): State<TopologyState>,
    tenant: TenantContext,
    Path(node_id): Path<String>,
) -> Result<Json<GraphNode>, ApiError> {
    let session = state.graph.session(tenant.tenant_id).await?;
    session
        .nodes(None)
        .await?
        .into_iter()
        .find(|node| node.id == node_id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Node not found"))
}

async fn create_node(
    State(state): State<TopologyState>,
    tenant: TenantContext,
    Json(body): Json<NodeCreate>,
) -> Result<(StatusCode, Json<GraphNode>), ApiError> {
    let session = state.graph.session(tenant.tenant_id).await?;
    let mut node = GraphNode::new(uuid::Uuid::new_v4().to_string(), body.label);
    node.properties = body.properties;
    session.merge_node(node.clone()).await?;
    Ok((StatusCode::CREATED, Json(node)))
}

async fn list_edges(State(state): State<TopologyState>, tenant: TenantContext) -> Result<Json<Vec<GraphEdge>>, ApiError> {
    let session = state.graph.session(tenant.tenant_id).await?;
    let mut edges = session.edges().await?;
    edges.truncate(state.limit);
    Ok(Json(edges))
}

async fn full_graph(State(state): State<TopologyState>, tenant: TenantContext) -> Result<Json<TopologyGraph>, ApiError> {
    let session = state.graph.session(tenant.tenant_id).await?;
    Ok(Json(snapshot(session.as_ref()).await?))
}

/// Catalog constructor. Recognized settings: `query_limit` (default 25).
pub fn create_plugin(config: &ConfigData) -> Result<Box<dyn Plugin>, PluginSystemError> {
    let limit: usize = config
        .try_get_or("query_limit", DEFAULT_QUERY_LIMIT)
        .map_err(|e| PluginSystemError::config(PLUGIN_NAME, e))?;
    if limit == 0 {
        return Err(PluginSystemError::config(PLUGIN_NAME, "query_limit must be greater than zero"));
    }
    Ok(Box::new(TopologyPlugin::new(limit)))
}
