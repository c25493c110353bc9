use serde_json::json;

use crate::services::{GraphEdge, GraphNode, GraphProvider, InMemoryGraphProvider, ServiceError};
use crate::tenant::TenantId;

fn edge(from: &str, to: &str) -> GraphEdge {
    GraphEdge {
        from: from.to_string(),
        to: to.to_string(),
        relation: "CONNECTED_TO".to_string(),
    }
}

#[tokio::test]
async fn test_merge_node_updates_in_place() {
    let provider = InMemoryGraphProvider::new();
    let graph = provider.session(TenantId::new_v4()).await.unwrap();

    graph
        .merge_node(GraphNode::new("r1", "Device").with_property("vendor", json!("juniper")))
        .await
        .unwrap();
    graph
        .merge_node(GraphNode::new("r1", "Router").with_property("role", json!("core")))
        .await
        .unwrap();

    let nodes = graph.nodes(None).await.unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].label, "Router");
    assert_eq!(nodes[0].properties.get("vendor"), Some(&json!("juniper")));
    assert_eq!(nodes[0].properties.get("role"), Some(&json!("core")));
}

#[tokio::test]
async fn test_label_filter_and_edge_dedup() {
    let provider = InMemoryGraphProvider::new();
    let graph = provider.session(TenantId::new_v4()).await.unwrap();

    graph.merge_node(GraphNode::new("s1", "Site")).await.unwrap();
    graph.merge_node(GraphNode::new("d1", "Device")).await.unwrap();
    graph.merge_node(GraphNode::new("d2", "Device")).await.unwrap();
    graph.merge_edge(edge("d1", "d2")).await.unwrap();
    graph.merge_edge(edge("d1", "d2")).await.unwrap();

    let devices: Vec<String> = graph
        .nodes(Some("Device"))
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(devices, vec!["d1", "d2"]);
    assert_eq!(graph.edges().await.unwrap(), vec![edge("d1", "d2")]);
}

#[tokio::test]
async fn test_graphs_are_partitioned_by_tenant() {
    let provider = InMemoryGraphProvider::new();
    let a = provider.session(TenantId::new_v4()).await.unwrap();
    let b = provider.session(TenantId::new_v4()).await.unwrap();

    a.merge_node(GraphNode::new("n", "Site")).await.unwrap();
    assert!(b.nodes(None).await.unwrap().is_empty());
    assert!(b.edges().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ping_fails_after_close() {
    let provider = InMemoryGraphProvider::new();
    assert!(provider.ping().await.is_ok());
    provider.close().await;
    assert!(matches!(provider.ping().await, Err(ServiceError::Closed { .. })));
    assert!(provider.session(TenantId::new_v4()).await.is_err());
}
