use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use axum::Router;
use futures::FutureExt;
use serde::Serialize;

use crate::plugin_system::context::PluginContext;
use crate::plugin_system::dependency::{DependencyError, DependencyGraph};
use crate::plugin_system::error::{PluginSystemError, panic_message};
use crate::plugin_system::health::HealthReport;
use crate::plugin_system::metadata::{PluginMetadata, validate_plugin_name};
use crate::plugin_system::traits::Plugin;
use crate::tenant::TenantId;

/// Lifecycle state of a registered plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PluginState {
    Registered,
    Initializing,
    Initialized,
    ShuttingDown,
    ShutDown,
}

/// Outcome of [`PluginRegistry::shutdown_all`]
#[derive(Debug, Default)]
pub struct ShutdownSummary {
    /// Plugins that shut down cleanly, in shutdown order
    pub stopped: Vec<String>,
    /// Plugins whose shutdown failed or panicked
    pub failed: Vec<PluginSystemError>,
}

impl ShutdownSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

struct PluginEntry {
    plugin: Box<dyn Plugin>,
    metadata: PluginMetadata,
    state: PluginState,
}

#[derive(Clone, Copy)]
enum TenantHook {
    Created,
    Deleted,
}

impl TenantHook {
    fn name(self) -> &'static str {
        match self {
            TenantHook::Created => "on_tenant_created",
            TenantHook::Deleted => "on_tenant_deleted",
        }
    }
}

/// Registry for managing plugins.
///
/// Sole owner of every plugin instance and the only component that drives
/// their lifecycle. The plugin set is fixed once `initialize_all` starts.
pub struct PluginRegistry {
    /// Registered plugins, in registration order
    entries: Vec<PluginEntry>,
    /// Plugin name -> position in `entries`
    index: HashMap<String, usize>,
    /// Order computed by the last `initialize_all`
    load_order: Vec<String>,
    /// Upper bound on a single plugin's initialize
    init_timeout: Option<Duration>,
    sealed: bool,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            load_order: Vec::new(),
            init_timeout: None,
            sealed: false,
        }
    }

    /// Bound each plugin's initialize; exceeding it fails startup
    pub fn with_init_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.init_timeout = timeout;
        self
    }

    /// Register a plugin.
    ///
    /// A duplicate or invalid name is rejected and the existing instance is
    /// left untouched.
    pub fn register(&mut self, plugin: Box<dyn Plugin>) -> Result<(), PluginSystemError> {
        let metadata = std::panic::catch_unwind(AssertUnwindSafe(|| plugin.metadata())).map_err(|payload| {
            PluginSystemError::RegistrationError {
                plugin_id: "<unknown>".to_string(),
                message: format!("metadata() panicked: {}", panic_message(payload.as_ref())),
            }
        })?;
        let name = metadata.name.clone();

        let rejection = if self.sealed {
            Some("registry is sealed once initialization has started".to_string())
        } else if self.index.contains_key(&name) {
            Some("plugin already registered".to_string())
        } else {
            validate_plugin_name(&name).err()
        };
        if let Some(message) = rejection {
            log::warn!("Rejected registration of plugin '{}': {}", name, message);
            return Err(PluginSystemError::RegistrationError {
                plugin_id: name,
                message,
            });
        }

        log::info!("Registered plugin '{}' v{}", name, metadata.version);
        self.index.insert(name, self.entries.len());
        self.entries.push(PluginEntry {
            plugin,
            metadata,
            state: PluginState::Registered,
        });
        Ok(())
    }

    /// Resolve the load order of the registered set without initializing anything
    pub fn compute_load_order(&self) -> Result<Vec<String>, DependencyError> {
        let mut graph = DependencyGraph::new();
        for entry in &self.entries {
            graph.add(entry.metadata.name.as_str(), entry.metadata.requires.iter().map(String::as_str));
        }
        graph.resolve()
    }

    /// Initialize every plugin, strictly one after another, in load order.
    ///
    /// Stops at the first failure, timeout or panic. The failing plugin and
    /// every plugin after it stay uninitialized and the error is returned.
    /// Plugins initialized before the failure are left running for the
    /// caller to shut down.
    /// A plugin cut off by the init timeout gets one bounded `shutdown`
    /// call to release partial state.
    pub async fn initialize_all(&mut self, ctx: &PluginContext) -> Result<(), PluginSystemError> {
        if self.sealed {
            return Err(PluginSystemError::OperationError {
                plugin_id: None,
                message: "initialize_all may only run once per registry".to_string(),
            });
        }
        self.sealed = true;

        let order = self.compute_load_order()?;
        log::info!("Plugin load order: [{}]", order.join(", "));
        self.load_order = order.clone();

        let timeout = self.init_timeout;
        for name in &order {
            let Some(&idx) = self.index.get(name) else {
                continue;
            };
            let entry = &mut self.entries[idx];
            entry.state = PluginState::Initializing;
            log::info!("Initializing plugin '{}'", name);

            let guarded = AssertUnwindSafe(entry.plugin.initialize(ctx)).catch_unwind();
            let flatten = |outcome: std::thread::Result<Result<(), PluginSystemError>>| {
                outcome.unwrap_or_else(|payload| {
                    Err(PluginSystemError::Panicked {
                        plugin_id: name.clone(),
                        operation: "initialize",
                        message: panic_message(payload.as_ref()),
                    })
                })
            };
            let result = match timeout {
                Some(limit) => match tokio::time::timeout(limit, guarded).await {
                    Ok(outcome) => flatten(outcome),
                    Err(_) => Err(PluginSystemError::InitializationTimeout {
                        plugin_id: name.clone(),
                        timeout_secs: limit.as_secs(),
                    }),
                },
                None => flatten(guarded.await),
            };

            match result {
                Ok(()) => {
                    entry.state = PluginState::Initialized;
                    log::info!("Plugin '{}' initialized", name);
                }
                Err(e) => {
                    entry.state = PluginState::Registered;
                    log::error!("Failed to initialize plugin '{}': {}. Aborting startup.", name, e);
                    if let (PluginSystemError::InitializationTimeout { .. }, Some(limit)) = (&e, timeout) {
                        // The initialize future was dropped mid-flight; give the
                        // plugin one bounded chance to release what it took.
                        log::error!(
                            "Plugin '{}' was cancelled mid-initialize. Its resources may have leaked; attempting shutdown.",
                            name
                        );
                        let cleanup = AssertUnwindSafe(entry.plugin.shutdown()).catch_unwind();
                        match tokio::time::timeout(limit, cleanup).await {
                            Ok(Ok(Ok(()))) => log::info!("Released partial state of plugin '{}'", name),
                            Ok(Ok(Err(err))) => log::error!(
                                "Cleanup of plugin '{}' failed: {}. Its resources may have leaked.",
                                name,
                                err
                            ),
                            Ok(Err(payload)) => log::error!(
                                "Cleanup of plugin '{}' panicked: {}. Its resources may have leaked.",
                                name,
                                panic_message(payload.as_ref())
                            ),
                            Err(_) => log::error!(
                                "Cleanup of plugin '{}' timed out. Its resources may have leaked.",
                                name
                            ),
                        }
                    }
                    return Err(e);
                }
            }
        }

        log::info!("All {} plugins initialized", order.len());
        Ok(())
    }

    /// Shut down every initialized plugin in exact reverse load order.
    ///
    /// Best effort: a failing or panicking plugin is logged and recorded,
    /// and the remaining plugins are still shut down. Calling again is a
    /// no-op.
    pub async fn shutdown_all(&mut self) -> ShutdownSummary {
        let mut summary = ShutdownSummary::default();
        let order: Vec<String> = self.load_order.iter().rev().cloned().collect();

        for name in order {
            let Some(&idx) = self.index.get(&name) else {
                continue;
            };
            let entry = &mut self.entries[idx];
            if entry.state != PluginState::Initialized {
                continue;
            }
            entry.state = PluginState::ShuttingDown;
            log::info!("Shutting down plugin '{}'", name);

            let outcome = AssertUnwindSafe(entry.plugin.shutdown()).catch_unwind().await;
            entry.state = PluginState::ShutDown;
            let error = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                Err(payload) => Some(PluginSystemError::Panicked {
                    plugin_id: name.clone(),
                    operation: "shutdown",
                    message: panic_message(payload.as_ref()),
                }),
            };
            match error {
                None => summary.stopped.push(name),
                Some(e) => {
                    log::error!(
                        "Error shutting down plugin '{}': {}. Its resources may have leaked.",
                        name,
                        e
                    );
                    summary.failed.push(e);
                }
            }
        }

        if !summary.stopped.is_empty() || !summary.failed.is_empty() {
            log::info!(
                "Plugin shutdown complete: {} stopped, {} failed",
                summary.stopped.len(),
                summary.failed.len()
            );
        }
        summary
    }

    /// Probe every plugin, in load order (registration order before the
    /// first `initialize_all`). Never fails as a whole: a panicking probe
    /// becomes an unhealthy report and uninitialized plugins are reported
    /// unhealthy without being probed.
    pub async fn health_check_all(&self) -> Vec<HealthReport> {
        let mut reports = Vec::with_capacity(self.entries.len());
        for name in self.ordered_names() {
            let Some(&idx) = self.index.get(name) else {
                continue;
            };
            let entry = &self.entries[idx];
            let initialized = entry.state == PluginState::Initialized;

            let mut report = if initialized {
                AssertUnwindSafe(entry.plugin.health_check())
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| {
                        log::error!("Health check of plugin '{}' panicked", name);
                        HealthReport::unhealthy(format!(
                            "health check panicked: {}",
                            panic_message(payload.as_ref())
                        ))
                    })
            } else {
                HealthReport::unhealthy("plugin not initialized")
            };
            report.plugin = name.to_string();
            report.initialized = initialized;
            reports.push(report);
        }
        reports
    }

    /// Run `on_tenant_created` on every initialized plugin in load order
    pub async fn notify_tenant_created(&self, tenant: TenantId) -> Vec<PluginSystemError> {
        self.notify_tenant(tenant, TenantHook::Created).await
    }

    /// Run `on_tenant_deleted` on every initialized plugin in load order
    pub async fn notify_tenant_deleted(&self, tenant: TenantId) -> Vec<PluginSystemError> {
        self.notify_tenant(tenant, TenantHook::Deleted).await
    }

    async fn notify_tenant(&self, tenant: TenantId, hook: TenantHook) -> Vec<PluginSystemError> {
        let mut failures = Vec::new();
        for name in &self.load_order {
            let Some(entry) = self.index.get(name).map(|&idx| &self.entries[idx]) else {
                continue;
            };
            if entry.state != PluginState::Initialized {
                continue;
            }
            let call = match hook {
                TenantHook::Created => entry.plugin.on_tenant_created(tenant),
                TenantHook::Deleted => entry.plugin.on_tenant_deleted(tenant),
            };
            let error = match AssertUnwindSafe(call).catch_unwind().await {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => PluginSystemError::TenantHookError {
                    plugin_id: name.clone(),
                    hook: hook.name(),
                    message: e.to_string(),
                },
                Err(payload) => PluginSystemError::TenantHookError {
                    plugin_id: name.clone(),
                    hook: hook.name(),
                    message: format!("panicked: {}", panic_message(payload.as_ref())),
                },
            };
            log::warn!("{} for tenant {}", error, tenant);
            failures.push(error);
        }
        failures
    }

    /// Routers of initialized plugins, in load order
    pub fn routers(&self) -> Vec<(String, Router)> {
        self.load_order
            .iter()
            .filter_map(|name| {
                let entry = &self.entries[*self.index.get(name)?];
                if entry.state != PluginState::Initialized {
                    return None;
                }
                entry.plugin.router().map(|router| (name.clone(), router))
            })
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Plugin> {
        self.index.get(name).map(|&idx| self.entries[idx].plugin.as_ref())
    }

    /// Metadata captured at registration
    pub fn metadata(&self, name: &str) -> Option<&PluginMetadata> {
        self.index.get(name).map(|&idx| &self.entries[idx].metadata)
    }

    /// Plugin names in registration order
    pub fn list_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.metadata.name.clone()).collect()
    }

    /// Order computed by `initialize_all`; empty before it has run
    pub fn load_order(&self) -> &[String] {
        &self.load_order
    }

    pub fn state(&self, name: &str) -> Option<PluginState> {
        self.index.get(name).map(|&idx| self.entries[idx].state)
    }

    pub fn is_initialized(&self, name: &str) -> bool {
        self.state(name) == Some(PluginState::Initialized)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ordered_names(&self) -> Vec<&str> {
        if self.load_order.is_empty() {
            self.entries.iter().map(|e| e.metadata.name.as_str()).collect()
        } else {
            self.load_order.iter().map(String::as_str).collect()
        }
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
