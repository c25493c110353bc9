//! # Netplat Core
//!
//! Plugin lifecycle and orchestration engine for the netplat multi-tenant
//! network platform. Product plugins are discovered, ordered by their
//! declared dependencies, initialized against shared tenant-scoped
//! collaborators and mounted under `/api/{plugin}` behind the tenant
//! isolation middleware.
pub mod api;
pub mod config;
pub mod kernel;
pub mod plugin_system;
pub mod services;
pub mod tenant;

// Re-export key public types/traits for the binary and the product plugins
pub use kernel::Application;
pub use kernel::error::Error as KernelError;
pub use plugin_system::{
    HealthReport, HealthStatus, Plugin, PluginCatalog, PluginContext, PluginDiscovery,
    PluginMetadata, PluginRegistry,
};
pub use tenant::{TenantContext, TenantId};

#[cfg(test)]
mod tests;
