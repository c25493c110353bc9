use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::services::error::ServiceError;
use crate::tenant::TenantId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            properties: Map::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub relation: String,
}

/// Graph-store session bound to a single tenant
#[async_trait]
pub trait GraphSession: Send + Sync {
    fn tenant_id(&self) -> TenantId;

    /// Create the node or update its label and merge its properties
    async fn merge_node(&self, node: GraphNode) -> Result<(), ServiceError>;

    /// Create the edge if an identical one does not exist yet
    async fn merge_edge(&self, edge: GraphEdge) -> Result<(), ServiceError>;

    /// Nodes ordered by id, optionally filtered by label
    async fn nodes(&self, label: Option<&str>) -> Result<Vec<GraphNode>, ServiceError>;

    async fn edges(&self) -> Result<Vec<GraphEdge>, ServiceError>;
}

#[async_trait]
pub trait GraphProvider: Send + Sync {
    async fn session(&self, tenant: TenantId) -> Result<Box<dyn GraphSession>, ServiceError>;

    /// Connectivity probe used by health checks
    async fn ping(&self) -> Result<(), ServiceError>;

    async fn close(&self);
}

#[derive(Default)]
struct TenantGraph {
    nodes: BTreeMap<String, GraphNode>,
    edges: Vec<GraphEdge>,
}

#[derive(Default)]
struct GraphStore {
    graphs: RwLock<HashMap<TenantId, TenantGraph>>,
    closed: AtomicBool,
}

impl GraphStore {
    fn ensure_open(&self) -> Result<(), ServiceError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ServiceError::Closed { service: "graph provider" });
        }
        Ok(())
    }
}

/// Process-local property graph partitioned by tenant
#[derive(Clone, Default)]
pub struct InMemoryGraphProvider {
    store: Arc<GraphStore>,
}

impl InMemoryGraphProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphProvider for InMemoryGraphProvider {
    async fn session(&self, tenant: TenantId) -> Result<Box<dyn GraphSession>, ServiceError> {
        self.store.ensure_open()?;
        Ok(Box::new(InMemoryGraphSession {
            tenant,
            store: Arc::clone(&self.store),
        }))
    }

    async fn ping(&self) -> Result<(), ServiceError> {
        self.store.ensure_open()
    }

    async fn close(&self) {
        if !self.store.closed.swap(true, Ordering::SeqCst) {
            log::info!("In-memory graph provider closed");
        }
    }
}

struct InMemoryGraphSession {
    tenant: TenantId,
    store: Arc<GraphStore>,
}

#[async_trait]
impl GraphSession for InMemoryGraphSession {
    fn tenant_id(&self) -> TenantId {
        self.tenant
    }

    async fn merge_node(&self, node: GraphNode) -> Result<(), ServiceError> {
        self.store.ensure_open()?;
        let mut graphs = self.store.graphs.write().await;
        let graph = graphs.entry(self.tenant).or_default();
        match graph.nodes.get_mut(&node.id) {
            Some(existing) => {
                existing.label = node.label;
                existing.properties.extend(node.properties);
            }
            None => {
                graph.nodes.insert(node.id.clone(), node);
            }
        }
        Ok(())
    }

    async fn merge_edge(&self, edge: GraphEdge) -> Result<(), ServiceError> {
        self.store.ensure_open()?;
        let mut graphs = self.store.graphs.write().await;
        let graph = graphs.entry(self.tenant).or_default();
        if !graph.edges.contains(&edge) {
            graph.edges.push(edge);
        }
        Ok(())
    }

    async fn nodes(&self, label: Option<&str>) -> Result<Vec<GraphNode>, ServiceError> {
        self.store.ensure_open()?;
        let graphs = self.store.graphs.read().await;
        Ok(graphs
            .get(&self.tenant)
            .map(|g| {
                g.nodes
                    .values()
                    .filter(|n| label.is_none_or(|l| n.label == l))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn edges(&self) -> Result<Vec<GraphEdge>, ServiceError> {
        self.store.ensure_open()?;
        let graphs = self.store.graphs.read().await;
        Ok(graphs
            .get(&self.tenant)
            .map(|g| g.edges.clone())
            .unwrap_or_default())
    }
}
