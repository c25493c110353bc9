use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::{Mutex, broadcast};

use crate::services::error::ServiceError;
use crate::tenant::TenantId;

/// An event as handed to the message bus
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedEvent {
    pub routing_key: String,
    pub payload: Value,
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, routing_key: &str, payload: Value) -> Result<(), ServiceError>;

    async fn close(&self);
}

/// Publish a tenant-scoped event.
///
/// Routing key is `{tenant}.{event_type}`; the body wraps the payload as
/// `{"event_type", "payload", "tenant_id"}`.
pub async fn publish_tenant_event(
    publisher: &dyn EventPublisher,
    tenant: TenantId,
    event_type: &str,
    payload: Value,
) -> Result<(), ServiceError> {
    let routing_key = format!("{}.{}", tenant, event_type);
    let body = json!({
        "event_type": event_type,
        "payload": payload,
        "tenant_id": tenant.to_string(),
    });
    publisher.publish(&routing_key, body).await
}

/// Records every published event and fans it out to subscribers
pub struct InMemoryEventBus {
    sender: broadcast::Sender<PublishedEvent>,
    history: Mutex<Vec<PublishedEvent>>,
    closed: AtomicBool,
}

impl InMemoryEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            history: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Every event published so far, oldest first
    pub async fn published(&self) -> Vec<PublishedEvent> {
        self.history.lock().await.clone()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, routing_key: &str, payload: Value) -> Result<(), ServiceError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ServiceError::Closed { service: "event bus" });
        }
        let event = PublishedEvent {
            routing_key: routing_key.to_string(),
            payload,
        };
        log::debug!("Published event {}", event.routing_key);
        self.history.lock().await.push(event.clone());
        // No subscribers is not an error
        let _ = self.sender.send(event);
        Ok(())
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            log::info!("In-memory event bus closed");
        }
    }
}
