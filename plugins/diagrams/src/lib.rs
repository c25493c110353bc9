//! # Diagrams product plugin
//!
//! `GET /api/diagrams/render` renders the calling tenant's topology as a
//! Graphviz DOT document; `POST /api/diagrams/render` renders an explicit
//! [`DiagramRequest`] instead.
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use semver::Version;

use netplat_core::api::ApiError;
use netplat_core::config::ConfigData;
use netplat_core::plugin_system::{HealthReport, Plugin, PluginContext, PluginMetadata, PluginSystemError};
use netplat_core::services::GraphProvider;
use netplat_core::tenant::TenantContext;

pub mod renderer;

pub use renderer::{DiagramEdge, DiagramNode, DiagramRequest, render_dot};

pub const PLUGIN_NAME: &str = "diagrams";
pub const DOT_CONTENT_TYPE: &str = "text/vnd.graphviz";

const RANK_DIRECTIONS: [&str; 4] = ["TB", "LR", "BT", "RL"];

#[derive(Clone)]
struct DiagramState {
    graph: Arc<dyn GraphProvider>,
    rankdir: String,
}

pub struct DiagramsPlugin {
    rankdir: String,
    state: Option<DiagramState>,
}

impl DiagramsPlugin {
    pub fn new(rankdir: impl Into<String>) -> Self {
        Self {
            rankdir: rankdir.into(),
            state: None,
        }
    }
}

impl Default for DiagramsPlugin {
    fn default() -> Self {
        Self::new("LR")
    }
}

#[async_trait]
impl Plugin for DiagramsPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new(PLUGIN_NAME, Version::new(1, 0, 0))
            .with_description("Infrastructure diagram generation")
            .with_author("Network Platform Team")
            .requires([netplat_topology::PLUGIN_NAME])
            .capabilities(["diagram_rendering"])
    }

    async fn initialize(&mut self, ctx: &PluginContext) -> Result<(), PluginSystemError> {
        log::info!("Initializing Diagrams plugin");
        self.state = Some(DiagramState {
            graph: Arc::clone(&ctx.graph),
            rankdir: self.rankdir.clone(),
        });
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), PluginSystemError> {
        log::info!("Shutting down Diagrams plugin");
        self.state = None;
        Ok(())
    }

    fn router(&self) -> Option<Router> {
        let state = self.state.clone()?;
        Some(
            Router::new()
                .route("/render", get(render_topology).post(render_request))
                .with_state(state),
        )
    }

    async fn health_check(&self) -> HealthReport {
        match self.state {
            Some(_) => HealthReport::healthy(),
            None => HealthReport::unhealthy("not initialized"),
        }
    }
}

fn dot_response(dot: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, DOT_CONTENT_TYPE)], dot)
}

async fn render_topology(State(state): State<DiagramState>, tenant: TenantContext) -> Result<impl IntoResponse, ApiError> {
    let session = state.graph.session(tenant.tenant_id).await?;
    let graph = netplat_topology::snapshot(session.as_ref()).await?;
    let diagram = DiagramRequest::from_topology(tenant.tenant_id.to_string(), &graph);
    Ok(dot_response(render_dot(&diagram, &state.rankdir)))
}

async fn render_request(
    State(state): State<DiagramState>,
    _tenant: TenantContext,
    Json(diagram): Json<DiagramRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(edge) = diagram
        .edges
        .iter()
        .find(|e| !diagram.nodes.iter().any(|n| n.name == e.source) || !diagram.nodes.iter().any(|n| n.name == e.target))
    {
        return Err(ApiError::bad_request(format!(
            "edge {} -> {} references an unknown node",
            edge.source, edge.target
        )));
    }
    Ok(dot_response(render_dot(&diagram, &state.rankdir)))
}

/// Catalog constructor. Recognized settings: `rankdir` (`TB`, `LR`, `BT` or
/// `RL`; default `LR`).
pub fn create_plugin(config: &ConfigData) -> Result<Box<dyn Plugin>, PluginSystemError> {
    let rankdir: String = config
        .try_get_or("rankdir", "LR".to_string())
        .map_err(|e| PluginSystemError::config(PLUGIN_NAME, e))?;
    if !RANK_DIRECTIONS.contains(&rankdir.as_str()) {
        return Err(PluginSystemError::config(
            PLUGIN_NAME,
            format!("unsupported rankdir '{}'", rankdir),
        ));
    }
    Ok(Box::new(DiagramsPlugin::new(rankdir)))
}

#[cfg(test)]
mod tests;
