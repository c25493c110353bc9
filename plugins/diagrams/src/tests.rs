use std::str::FromStr;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use netplat_core::Application;
use netplat_core::config::PlatformConfig;
use netplat_core::plugin_system::PluginCatalog;
use netplat_core::services::{GraphEdge, GraphNode, InMemoryGraphProvider};
use netplat_core::tenant::TenantId;
use netplat_topology::TopologyGraph;

use super::*;

const TENANT: &str = "8c7b6a5f-4e3d-4c2b-8a1f-0e9d8c7b6a5f";

fn sample_graph() -> TopologyGraph {
    TopologyGraph {
        nodes: vec![
            GraphNode::new("core-1", "Device").with_property("name", json!("Core \"1\"")),
            GraphNode::new("hq", "Site"),
        ],
        edges: vec![GraphEdge {
            from: "core-1".into(),
            to: "hq".into(),
            relation: "LOCATED_AT".into(),
        }],
    }
}

#[test]
fn test_render_dot_from_topology() {
    let diagram = DiagramRequest::from_topology("acme", &sample_graph());
    let dot = render_dot(&diagram, "LR");

    assert!(dot.starts_with("digraph \"acme\" {\n  rankdir=LR;\n"));
    assert!(dot.contains("  \"core-1\" [label=\"Core \\\"1\\\"\", group=\"Device\"];\n"));
    assert!(dot.contains("  \"hq\" [label=\"hq\", group=\"Site\"];\n"));
    assert!(dot.contains("  \"core-1\" -> \"hq\" [label=\"LOCATED_AT\"];\n"));
    assert!(dot.ends_with("}\n"));
}

#[test]
fn test_unsupported_rankdir_is_rejected() {
    let mut config = ConfigData::new();
    config.set("rankdir", "diagonal").unwrap();
    assert!(create_plugin(&config).is_err());

    config.set("rankdir", "TB").unwrap();
    assert!(create_plugin(&config).is_ok());
}

#[test]
fn test_requires_topology() {
    assert_eq!(DiagramsPlugin::default().metadata().requires, vec!["topology"]);
}

async fn start(graph: Arc<InMemoryGraphProvider>) -> Router {
    // dependent listed first; the resolver puts topology ahead of it
    let catalog = PluginCatalog::new()
        .with(PLUGIN_NAME, create_plugin)
        .with(netplat_topology::PLUGIN_NAME, netplat_topology::create_plugin);
    let base = PluginContext::in_memory();
    let mut app = Application::new(PlatformConfig::default(), catalog)
        .unwrap()
        .with_services(PluginContext::new(base.sessions, graph, base.events, base.permissions));
    app.start().await.unwrap()
}

#[tokio::test]
async fn test_render_route_returns_dot_for_tenant_graph() {
    let graph = Arc::new(InMemoryGraphProvider::new());
    let tenant = TenantId::from_str(TENANT).unwrap();
    let session = graph.session(tenant).await.unwrap();
    for node in sample_graph().nodes {
        session.merge_node(node).await.unwrap();
    }
    let router = start(graph).await;

    let request = Request::get("/api/diagrams/render")
        .header("X-Tenant-ID", TENANT)
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], DOT_CONTENT_TYPE);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let dot = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(dot.starts_with(&format!("digraph \"{}\"", TENANT)));
    assert!(dot.contains("\"hq\""));
}

#[tokio::test]
async fn test_explicit_diagram_with_dangling_edge_is_rejected() {
    let router = start(Arc::new(InMemoryGraphProvider::new())).await;
    let body = json!({
        "name": "wan",
        "nodes": [{"name": "a", "label": "A"}],
        "edges": [{"source": "a", "target": "b"}],
    });
    let request = Request::post("/api/diagrams/render")
        .header("X-Tenant-ID", TENANT)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn test_mistyped_rankdir_is_rejected() {
    let mut config = ConfigData::new();
    config.set("rankdir", 5).unwrap();
    let err = create_plugin(&config).err().map(|e| e.to_string()).unwrap_or_default();
    assert!(err.contains("rankdir"), "unexpected error: {err}");
}
