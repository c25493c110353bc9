use std::sync::Arc;

use crate::services::{
    AllowAll, EventPublisher, GraphProvider, InMemoryEventBus, InMemoryGraphProvider,
    InMemorySessionProvider, PermissionChecker, SessionProvider,
};

/// Shared collaborators handed to every plugin's initialize.
///
/// Holds no tenant: plugins acquire tenant-bound sessions per request from
/// the providers, using the tenant the middleware attached to that request.
#[derive(Clone)]
pub struct PluginContext {
    pub sessions: Arc<dyn SessionProvider>,
    pub graph: Arc<dyn GraphProvider>,
    pub events: Arc<dyn EventPublisher>,
    pub permissions: Arc<dyn PermissionChecker>,
}

impl PluginContext {
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        graph: Arc<dyn GraphProvider>,
        events: Arc<dyn EventPublisher>,
        permissions: Arc<dyn PermissionChecker>,
    ) -> Self {
        Self {
            sessions,
            graph,
            events,
            permissions,
        }
    }

    /// Process-local collaborators that grant every permission
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemorySessionProvider::new()),
            Arc::new(InMemoryGraphProvider::new()),
            Arc::new(InMemoryEventBus::default()),
            Arc::new(AllowAll),
        )
    }

    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionChecker>) -> Self {
        self.permissions = permissions;
        self
    }

    /// Close every collaborator. Called after all plugins have shut down.
    pub async fn close(&self) {
        self.events.close().await;
        self.graph.close().await;
        self.sessions.close().await;
        self.permissions.close().await;
        log::info!("Shared collaborators closed");
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext").finish_non_exhaustive()
    }
}
