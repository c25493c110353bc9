use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::middleware;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::{AppState, platform_routes};
use crate::config::PlatformConfig;
use crate::kernel::constants::{APP_NAME, APP_VERSION, PLUGIN_MOUNT_PREFIX};
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::plugin_system::{
    DiscoveryReport, PluginCatalog, PluginContext, PluginDiscovery, PluginRegistry, ShutdownSummary,
};
use crate::tenant::{TenantPolicy, tenant_isolation};

/// Composition root of the platform process.
///
/// Owns the registry and the shared collaborators, and drives them through
/// start (discover, initialize, mount) and stop (plugins first, then the
/// collaborators they borrowed).
pub struct Application {
    config: PlatformConfig,
    discovery: PluginDiscovery,
    services: PluginContext,
    registry: Arc<RwLock<PluginRegistry>>,
    tenant_policy: TenantPolicy,
    started: bool,
}

impl Application {
    /// Build an application over the given plugin catalog, backed by the
    /// in-memory collaborators
    pub fn new(config: PlatformConfig, catalog: PluginCatalog) -> Result<Self> {
        let tenant_policy = TenantPolicy::from_settings(&config.tenant)?;
        let discovery = PluginDiscovery::from_settings(catalog, &config.plugins);
        let registry = PluginRegistry::new().with_init_timeout(config.plugins.init_timeout());
        Ok(Self {
            config,
            discovery,
            services: PluginContext::in_memory(),
            registry: Arc::new(RwLock::new(registry)),
            tenant_policy,
            started: false,
        })
    }

    /// Replace the shared collaborators injected into the plugins
    pub fn with_services(mut self, services: PluginContext) -> Self {
        self.services = services;
        self
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn services(&self) -> &PluginContext {
        &self.services
    }

    pub fn registry(&self) -> Arc<RwLock<PluginRegistry>> {
        Arc::clone(&self.registry)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Run discovery only, registering what it finds
    pub async fn discover(&self) -> DiscoveryReport {
        let mut registry = self.registry.write().await;
        self.discovery.discover_into(&mut registry).await
    }

    /// Discover, initialize every plugin in load order and compose the router.
    ///
    /// If any plugin fails to initialize, the plugins already initialized
    /// are shut down again and the error is returned; no router is produced.
    pub async fn start(&mut self) -> Result<Router> {
        if self.started {
            return Err(Error::lifecycle(
                KernelLifecyclePhase::Initialize,
                "application already started",
                None,
            ));
        }
        log::info!("Starting {} v{}", APP_NAME, APP_VERSION);

        let report = self.discover().await;
        if self.config.plugins.require_plugins {
            report.ensure_non_empty().map_err(|e| {
                Error::lifecycle(
                    KernelLifecyclePhase::Discover,
                    "plugins are required but none were discovered",
                    Some(e.into()),
                )
            })?;
        } else if report.registered.is_empty() {
            log::warn!("No plugins discovered; serving platform routes only");
        }

        let initialized = self.registry.write().await.initialize_all(&self.services).await;
        if let Err(e) = initialized {
            log::error!("Plugin initialization failed, rolling back: {}", e);
            let summary = self.registry.write().await.shutdown_all().await;
            if !summary.is_clean() {
                log::error!("{} plugins failed to shut down during rollback", summary.failed.len());
            }
            return Err(Error::lifecycle(
                KernelLifecyclePhase::Initialize,
                "plugin initialization failed",
                Some(e.into()),
            ));
        }

        self.started = true;
        let router = self.router().await;
        log::info!("{} ready", APP_NAME);
        Ok(router)
    }

    /// Compose platform routes and every initialized plugin's router under
    /// `/api/{name}`, all behind the tenant middleware
    pub async fn router(&self) -> Router {
        let state = AppState {
            registry: Arc::clone(&self.registry),
            services: self.services.clone(),
            tenant_policy: self.tenant_policy.clone(),
        };
        let mut app = platform_routes(state);

        let plugin_routers = self.registry.read().await.routers();
        for (name, plugin_router) in plugin_routers {
            let prefix = format!("{}/{}", PLUGIN_MOUNT_PREFIX, name);
            log::info!("Mounted plugin '{}' at {}", name, prefix);
            app = app.nest(&prefix, plugin_router);
        }

        app.layer(middleware::from_fn_with_state(
            self.tenant_policy.clone(),
            tenant_isolation,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
    }

    /// Shut every plugin down in reverse load order, then close the shared
    /// collaborators. Safe to call more than once.
    pub async fn stop(&mut self) -> ShutdownSummary {
        log::info!("Stopping {}", APP_NAME);
        let summary = self.registry.write().await.shutdown_all().await;
        for failure in &summary.failed {
            log::error!("Shutdown failure: {}", failure);
        }
        self.services.close().await;
        self.started = false;
        summary
    }

    /// Start, bind the configured address, serve until Ctrl-C, then stop
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Like [`Application::serve`], stopping when `signal` completes.
    ///
    /// The listener is bound only after a successful start, so a platform
    /// that failed to start never accepts a connection.
    pub async fn serve_with_shutdown<F>(mut self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.start().await?;

        let bind = self.config.server.bind;
        let listener = match TcpListener::bind(bind).await {
            Ok(listener) => listener,
            Err(e) => {
                self.stop().await;
                return Err(Error::lifecycle(
                    KernelLifecyclePhase::Serve,
                    format!("failed to bind {}", bind),
                    Some(Error::io(e, "bind")),
                ));
            }
        };
        match listener.local_addr() {
            Ok(addr) => log::info!("Listening on http://{}", addr),
            Err(_) => log::info!("Listening on http://{}", bind),
        }

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(signal)
            .await;

        let summary = self.stop().await;
        served.map_err(|e| {
            Error::lifecycle(KernelLifecyclePhase::Serve, "server error", Some(Error::io(e, "serve")))
        })?;
        if !summary.is_clean() {
            return Err(Error::lifecycle(
                KernelLifecyclePhase::Shutdown,
                format!("{} plugins failed to shut down", summary.failed.len()),
                None,
            ));
        }
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("Shutdown signal received"),
        Err(e) => {
            log::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await
        }
    }
}
