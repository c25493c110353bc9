use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::services::error::ServiceError;
use crate::tenant::TenantId;

/// A data-access session bound to a single tenant.
///
/// The tenant is fixed at acquisition. Every read and write is implicitly
/// scoped to it.
#[async_trait]
pub trait TenantSession: Send + Sync {
    /// The tenant this session is bound to
    fn tenant_id(&self) -> TenantId;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, ServiceError>;

    /// Insert or replace a document
    async fn insert(&self, collection: &str, id: &str, document: Value) -> Result<(), ServiceError>;

    /// All documents of a collection, ordered by id
    async fn list(&self, collection: &str) -> Result<Vec<Value>, ServiceError>;

    /// Remove a document. Returns whether it existed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, ServiceError>;
}

/// Hands out tenant-bound sessions
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn acquire(&self, tenant: TenantId) -> Result<Box<dyn TenantSession>, ServiceError>;

    /// Release pooled resources. Later acquisitions fail with [`ServiceError::Closed`].
    async fn close(&self);
}

type Collections = HashMap<String, BTreeMap<String, Value>>;

#[derive(Default)]
struct Store {
    tenants: RwLock<HashMap<TenantId, Collections>>,
    closed: AtomicBool,
}

impl Store {
    fn ensure_open(&self) -> Result<(), ServiceError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ServiceError::Closed { service: "session provider" });
        }
        Ok(())
    }
}

/// Process-local document store partitioned by tenant
#[derive(Clone, Default)]
pub struct InMemorySessionProvider {
    store: Arc<Store>,
}

impl InMemorySessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tenants that have written at least one document
    pub async fn tenant_count(&self) -> usize {
        self.store.tenants.read().await.len()
    }
}

#[async_trait]
impl SessionProvider for InMemorySessionProvider {
    async fn acquire(&self, tenant: TenantId) -> Result<Box<dyn TenantSession>, ServiceError> {
        self.store.ensure_open()?;
        Ok(Box::new(InMemorySession {
            tenant,
            store: Arc::clone(&self.store),
        }))
    }

    async fn close(&self) {
        if !self.store.closed.swap(true, Ordering::SeqCst) {
            log::info!("In-memory session provider closed");
        }
    }
}

struct InMemorySession {
    tenant: TenantId,
    store: Arc<Store>,
}

#[async_trait]
impl TenantSession for InMemorySession {
    fn tenant_id(&self) -> TenantId {
        self.tenant
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, ServiceError> {
        self.store.ensure_open()?;
        let tenants = self.store.tenants.read().await;
        Ok(tenants
            .get(&self.tenant)
            .and_then(|c| c.get(collection))
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn insert(&self, collection: &str, id: &str, document: Value) -> Result<(), ServiceError> {
        self.store.ensure_open()?;
        let mut tenants = self.store.tenants.write().await;
        tenants
            .entry(self.tenant)
            .or_default()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, ServiceError> {
        self.store.ensure_open()?;
        let tenants = self.store.tenants.read().await;
        Ok(tenants
            .get(&self.tenant)
            .and_then(|c| c.get(collection))
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, ServiceError> {
        self.store.ensure_open()?;
        let mut tenants = self.store.tenants.write().await;
        Ok(tenants
            .get_mut(&self.tenant)
            .and_then(|c| c.get_mut(collection))
            .and_then(|docs| docs.remove(id))
            .is_some())
    }
}
