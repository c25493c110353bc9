use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::routing::get;
use semver::Version;

use crate::plugin_system::{HealthReport, Plugin, PluginContext, PluginMetadata, PluginSystemError};
use crate::tenant::TenantId;

pub type Tracker = Arc<StdMutex<Vec<String>>>;

pub fn tracker() -> Tracker {
    Arc::new(StdMutex::new(Vec::new()))
}

pub fn recorded(tracker: &Tracker) -> Vec<String> {
    tracker.lock().unwrap().clone()
}

/// How a mock lifecycle call behaves
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    Succeed,
    Fail,
    Panic,
    Hang,
}

// --- Mock Plugin for lifecycle tests ---
pub struct MockPlugin {
    pub name: String,
    pub requires: Vec<String>,
    pub tracker: Tracker,
    pub on_init: Behavior,
    pub on_shutdown: Behavior,
    pub on_health: Behavior,
    pub on_tenant_hook: Behavior,
    pub with_router: bool,
    initialized: bool,
}

impl MockPlugin {
    pub fn new(name: &str, requires: &[&str], tracker: &Tracker) -> Self {
        Self {
            name: name.to_string(),
            requires: requires.iter().map(|s| s.to_string()).collect(),
            tracker: Arc::clone(tracker),
            on_init: Behavior::Succeed,
            on_shutdown: Behavior::Succeed,
            on_health: Behavior::Succeed,
            on_tenant_hook: Behavior::Succeed,
            with_router: true,
            initialized: false,
        }
    }

    pub fn init(mut self, behavior: Behavior) -> Self {
        self.on_init = behavior;
        self
    }

    pub fn shutdown(mut self, behavior: Behavior) -> Self {
        self.on_shutdown = behavior;
        self
    }

    pub fn health(mut self, behavior: Behavior) -> Self {
        self.on_health = behavior;
        self
    }

    pub fn tenant_hook(mut self, behavior: Behavior) -> Self {
        self.on_tenant_hook = behavior;
        self
    }

    pub fn without_router(mut self) -> Self {
        self.with_router = false;
        self
    }

    pub fn boxed(self) -> Box<dyn Plugin> {
        Box::new(self)
    }

    fn record(&self, event: &str) {
        self.tracker.lock().unwrap().push(format!("{}:{}", event, self.name));
    }

    async fn act(&self, behavior: Behavior, operation: &str) -> Result<(), PluginSystemError> {
        match behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(PluginSystemError::OperationError {
                plugin_id: Some(self.name.clone()),
                message: format!("{} failed on purpose", operation),
            }),
            Behavior::Panic => panic!("{} panicked on purpose", operation),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Plugin for MockPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new(self.name.clone(), Version::new(1, 0, 0))
            .with_description("mock plugin")
            .requires(self.requires.clone())
    }

    async fn initialize(&mut self, _ctx: &PluginContext) -> Result<(), PluginSystemError> {
        self.record("init");
        self.act(self.on_init, "initialize").await?;
        self.initialized = true;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), PluginSystemError> {
        self.record("shutdown");
        self.initialized = false;
        self.act(self.on_shutdown, "shutdown").await
    }

    fn router(&self) -> Option<Router> {
        if !(self.initialized && self.with_router) {
            return None;
        }
        let name = self.name.clone();
        Some(Router::new().route("/ping", get(move || async move { format!("pong from {}", name) })))
    }

    async fn health_check(&self) -> HealthReport {
        match self.on_health {
            Behavior::Panic => panic!("health probe exploded"),
            Behavior::Fail => HealthReport::degraded("upstream slow"),
            _ => HealthReport::healthy(),
        }
    }

    async fn on_tenant_created(&self, _tenant: TenantId) -> Result<(), PluginSystemError> {
        self.record("tenant_created");
        self.act(self.on_tenant_hook, "on_tenant_created").await
    }

    async fn on_tenant_deleted(&self, _tenant: TenantId) -> Result<(), PluginSystemError> {
        self.record("tenant_deleted");
        self.act(self.on_tenant_hook, "on_tenant_deleted").await
    }
}
