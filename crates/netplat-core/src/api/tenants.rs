use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use serde::Serialize;
use serde_json::json;

use crate::api::{ApiError, AppState};
use crate::services::publish_tenant_event;
use crate::tenant::TenantId;

const TENANT_RESOURCE: &str = "tenants";

#[derive(Clone, Copy)]
enum Lifecycle {
    Create,
    Delete,
}

impl Lifecycle {
    fn action(self) -> &'static str {
        match self {
            Lifecycle::Create => "create",
            Lifecycle::Delete => "delete",
        }
    }

    fn event(self) -> &'static str {
        match self {
            Lifecycle::Create => "tenant.created",
            Lifecycle::Delete => "tenant.deleted",
        }
    }
}

/// Outcome of a tenant lifecycle call
#[derive(Debug, Serialize)]
pub struct TenantLifecycleResponse {
    pub tenant_id: TenantId,
    pub event: &'static str,
    /// Plugins whose hook failed, with the reason
    pub failures: Vec<String>,
}

pub async fn create_tenant(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<TenantLifecycleResponse>), ApiError> {
    let response = run_lifecycle(&state, &tenant_id, &headers, Lifecycle::Create).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn delete_tenant(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<TenantLifecycleResponse>, ApiError> {
    let response = run_lifecycle(&state, &tenant_id, &headers, Lifecycle::Delete).await?;
    Ok(Json(response))
}

async fn run_lifecycle(
    state: &AppState,
    raw_tenant: &str,
    headers: &HeaderMap,
    lifecycle: Lifecycle,
) -> Result<TenantLifecycleResponse, ApiError> {
    let (action, event) = (lifecycle.action(), lifecycle.event());
    let tenant: TenantId = raw_tenant.parse()?;
    let subject = state
        .tenant_policy
        .subject(headers)
        .unwrap_or_else(|| "anonymous".to_string());

    let allowed = state
        .services
        .permissions
        .check(&subject, TENANT_RESOURCE, action, tenant)
        .await?;
    if !allowed {
        log::warn!("Subject '{}' may not {} tenant {}", subject, action, tenant);
        return Err(ApiError::forbidden(format!("Not allowed to {} tenants", action)));
    }

    let failures = {
        let registry = state.registry.read().await;
        match lifecycle {
            Lifecycle::Create => registry.notify_tenant_created(tenant).await,
            Lifecycle::Delete => registry.notify_tenant_deleted(tenant).await,
        }
    };

    if let Err(e) = publish_tenant_event(state.services.events.as_ref(), tenant, event, json!({})).await {
        log::warn!("Could not publish {} for tenant {}: {}", event, tenant, e);
    }
    log::info!("Tenant {} {} ({} hook failures)", tenant, event, failures.len());

    Ok(TenantLifecycleResponse {
        tenant_id: tenant,
        event,
        failures: failures.iter().map(ToString::to_string).collect(),
    })
}
