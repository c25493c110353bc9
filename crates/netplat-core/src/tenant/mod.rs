//! # Netplat Core Tenant Isolation
//!
//! Establishes the tenant boundary for every inbound request before any
//! handler or plugin code runs.
//!
//! - **[`context`]**: [`TenantId`] (validated identifier) and the
//!   request-scoped [`TenantContext`] handlers extract.
//! - **[`middleware`]**: [`TenantPolicy`] and the [`tenant_isolation`]
//!   middleware function the application composer layers over the router.
//! - **[`error`]**: [`TenantError`], rendered as 401 (missing) or 400
//!   (malformed).
//!
//! A [`TenantContext`] lives only in the extensions of the request it was
//! created for. Nothing long-lived (registry, plugin instance) may hold one.
pub mod context;
pub mod error;
pub mod middleware;

pub use context::{TenantContext, TenantId};
pub use error::TenantError;
pub use middleware::{TenantPolicy, tenant_isolation};
