//! # Netplat Core Shared Collaborators
//!
//! Capability interfaces the platform injects into every plugin's
//! initialize, and the in-memory implementations used in development and
//! tests. Concrete database, graph-store, message-bus and policy-engine
//! clients implement the same traits outside this crate.
//!
//! Tenant isolation is enforced here: a [`TenantSession`] or
//! [`GraphSession`] is bound to exactly one tenant when it is acquired and
//! exposes no operation that names another tenant.
pub mod error;
pub mod events;
pub mod graph;
pub mod permissions;
pub mod session;

pub use error::ServiceError;
pub use events::{EventPublisher, InMemoryEventBus, PublishedEvent, publish_tenant_event};
pub use graph::{GraphEdge, GraphNode, GraphProvider, GraphSession, InMemoryGraphProvider};
pub use permissions::{AllowAll, PermissionChecker, PolicyRule, PolicyTable};
pub use session::{InMemorySessionProvider, SessionProvider, TenantSession};

#[cfg(test)]
mod tests;
