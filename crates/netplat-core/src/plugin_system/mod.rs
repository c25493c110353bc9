//! # Netplat Core Plugin System
//!
//! Discovery, dependency ordering and lifecycle management of product
//! plugins.
//!
//! ## Key Components
//!
//! - **[`traits`]**: the [`Plugin`] trait every product implements
//!   (metadata, initialize, shutdown, router, health, tenant hooks).
//! - **[`metadata`]**: [`PluginMetadata`], the immutable plugin descriptor.
//! - **[`dependency`]**: [`DependencyGraph`] and the deterministic
//!   depth-first load-order resolver. Cycles are rejected.
//! - **[`registry`]**: [`PluginRegistry`], sole owner of plugin instances,
//!   driving sequential initialization, reverse-order shutdown, health
//!   aggregation and tenant hooks.
//! - **[`discovery`]**: [`PluginDiscovery`] over the compile-time
//!   [`PluginCatalog`] or a products directory of [`manifest`] files.
//! - **[`context`]**: [`PluginContext`], the shared collaborators injected
//!   into initialize.
//! - **[`health`]**: [`HealthReport`] and [`HealthStatus`].
//! - **[`error`]**: [`PluginSystemError`].
pub mod context;
pub mod dependency;
pub mod discovery;
pub mod error;
pub mod health;
pub mod manifest;
pub mod metadata;
pub mod registry;
pub mod traits;

pub use context::PluginContext;
pub use dependency::{DependencyError, DependencyGraph, resolve_load_order};
pub use discovery::{DiscoveryReport, PluginCatalog, PluginConstructor, PluginDiscovery};
pub use error::PluginSystemError;
pub use health::{HealthReport, HealthStatus};
pub use manifest::PluginManifest;
pub use metadata::PluginMetadata;
pub use registry::{PluginRegistry, PluginState, ShutdownSummary};
pub use traits::Plugin;

#[cfg(test)]
mod tests;
