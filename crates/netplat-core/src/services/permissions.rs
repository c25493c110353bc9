use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::services::error::ServiceError;
use crate::tenant::TenantId;

/// Authorization capability consumed by plugins and the tenant admin routes
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    async fn check(
        &self,
        subject: &str,
        resource: &str,
        action: &str,
        tenant: TenantId,
    ) -> Result<bool, ServiceError>;

    async fn close(&self) {}
}

/// Grants everything. Development mode only.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl PermissionChecker for AllowAll {
    async fn check(&self, _: &str, _: &str, _: &str, _: TenantId) -> Result<bool, ServiceError> {
        Ok(true)
    }
}

/// One grant. `*` matches any subject, resource or action; a `None` tenant
/// matches every tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRule {
    pub subject: String,
    pub resource: String,
    pub action: String,
    pub tenant: Option<TenantId>,
}

impl PolicyRule {
    fn matches(&self, subject: &str, resource: &str, action: &str, tenant: TenantId) -> bool {
        let field = |pattern: &str, value: &str| pattern == "*" || pattern == value;
        field(&self.subject, subject)
            && field(&self.resource, resource)
            && field(&self.action, action)
            && self.tenant.is_none_or(|t| t == tenant)
    }
}

/// Allow-list of grants; anything not granted is denied
#[derive(Debug, Default)]
pub struct PolicyTable {
    rules: RwLock<Vec<PolicyRule>>,
    closed: AtomicBool,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`PolicyTable::grant`] for a rule valid in every tenant
    pub fn allow(mut self, subject: &str, resource: &str, action: &str) -> Self {
        self.rules.get_mut().push(PolicyRule {
            subject: subject.to_string(),
            resource: resource.to_string(),
            action: action.to_string(),
            tenant: None,
        });
        self
    }

    pub async fn grant(&self, rule: PolicyRule) {
        self.rules.write().await.push(rule);
    }

    pub async fn rule_count(&self) -> usize {
        self.rules.read().await.len()
    }
}

#[async_trait]
impl PermissionChecker for PolicyTable {
    async fn check(
        &self,
        subject: &str,
        resource: &str,
        action: &str,
        tenant: TenantId,
    ) -> Result<bool, ServiceError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ServiceError::Closed { service: "permission checker" });
        }
        let allowed = self
            .rules
            .read()
            .await
            .iter()
            .any(|rule| rule.matches(subject, resource, action, tenant));
        if !allowed {
            log::debug!("Denied {} {} on {} for tenant {}", subject, action, resource, tenant);
        }
        Ok(allowed)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
