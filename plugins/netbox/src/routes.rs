use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;

use netplat_core::api::ApiError;
use netplat_core::services::{
    EventPublisher, PermissionChecker, SessionProvider, TenantSession, publish_tenant_event,
};
use netplat_core::tenant::TenantContext;

use crate::models::{Device, DeviceCreate, Site, SiteCreate};
use crate::{DEVICES, SITES};

#[derive(Clone)]
pub(crate) struct NetboxState {
    pub sessions: Arc<dyn SessionProvider>,
    pub events: Arc<dyn EventPublisher>,
    pub permissions: Arc<dyn PermissionChecker>,
    pub publish_events: bool,
    /// Held across the site-exists check and the write in `create_device`
    /// and `delete_site`, so a site is never removed under a new device
    pub inventory_writes: Arc<Mutex<()>>,
}

pub(crate) fn router(state: NetboxState) -> Router {
    Router::new()
        .route("/sites", get(list_sites).post(create_site))
        .route("/sites/:site_id", get(get_site).delete(delete_site))
        .route("/devices", get(list_devices).post(create_device))
        .route("/devices/:device_id", get(get_device).delete(delete_device))
        .with_state(state)
}

impl NetboxState {
    async fn authorize(&self, tenant: &TenantContext, resource: &str, action: &str) -> Result<(), ApiError> {
        let subject = tenant.subject_or_anonymous();
        let allowed = self
            .permissions
            .check(subject, resource, action, tenant.tenant_id)
            .await?;
        if !allowed {
            log::warn!("Denied {} on {} for '{}' in tenant {}", action, resource, subject, tenant.tenant_id);
            return Err(ApiError::forbidden(format!("'{}' may not {} {}", subject, action, resource)));
        }
        Ok(())
    }

    // The write already happened, so a bus failure is logged rather than returned
    async fn publish(&self, tenant: &TenantContext, event_type: &str, payload: Value) {
        if !self.publish_events {
            return;
        }
        if let Err(e) = publish_tenant_event(self.events.as_ref(), tenant.tenant_id, event_type, payload).await {
            log::warn!("Failed to publish {} for tenant {}: {}", event_type, tenant.tenant_id, e);
        }
    }
}

async fn load_all<T: DeserializeOwned>(session: &dyn TenantSession, collection: &str) -> Result<Vec<T>, ApiError> {
    session
        .list(collection)
        .await?
        .into_iter()
        .map(decode)
        .collect()
}

async fn load_one<T: DeserializeOwned>(
    session: &dyn TenantSession,
    collection: &str,
    id: &str,
) -> Result<Option<T>, ApiError> {
    session.get(collection, id).await?.map(decode).transpose()
}

fn decode<T: DeserializeOwned>(document: Value) -> Result<T, ApiError> {
    serde_json::from_value(document).map_err(|e| ApiError::internal(format!("corrupt inventory record: {}", e)))
}

fn encode<T: Serialize>(record: &T) -> Result<Value, ApiError> {
    serde_json::to_value(record).map_err(|e| ApiError::internal(e.to_string()))
}

// ===== SITES =====

async fn list_sites(State(state): State<NetboxState>, tenant: TenantContext) -> Result<Json<Vec<Site>>, ApiError> {
    let session = state.sessions.acquire(tenant.tenant_id).await?;
    Ok(Json(load_all(session.as_ref(), SITES).await?))
}

async fn get_site(
    State(state): State<NetboxState>,
    tenant: TenantContext,
    Path(site_id): Path<String>,
) -> Result<Json<Site>, ApiError> {
    let session = state.sessions.acquire(tenant.tenant_id).await?;
    load_one(session.as_ref(), SITES, &site_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Site not found"))
}

async fn create_site(
    State(state): State<NetboxState>,
    tenant: TenantContext,
    Json(body): Json<SiteCreate>,
) -> Result<(StatusCode, Json<Site>), ApiError> {
    state.authorize(&tenant, SITES, "create").await?;
    if body.name.trim().is_empty() {
        return Err(ApiError::bad_request("site name must not be empty"));
    }
    let site = body.into_site();
    let document = encode(&site)?;

    let session = state.sessions.acquire(tenant.tenant_id).await?;
    session.insert(SITES, &site.id, document.clone()).await?;
    log::info!("Created site '{}' for tenant {}", site.id, tenant.tenant_id);

    state.publish(&tenant, "site.created", document).await;
    Ok((StatusCode::CREATED, Json(site)))
}

async fn delete_site(
    State(state): State<NetboxState>,
    tenant: TenantContext,
    Path(site_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.authorize(&tenant, SITES, "delete").await?;
    let session = state.sessions.acquire(tenant.tenant_id).await?;

    let guard = state.inventory_writes.lock().await;
    let devices: Vec<Device> = load_all(session.as_ref(), DEVICES).await?;
    if devices.iter().any(|d| d.site_id == site_id) {
        return Err(ApiError::new(StatusCode::CONFLICT, "Site still has devices"));
    }
    if !session.delete(SITES, &site_id).await? {
        return Err(ApiError::not_found("Site not found"));
    }
    drop(guard);
    log::info!("Deleted site '{}' for tenant {}", site_id, tenant.tenant_id);

    state
        .publish(&tenant, "site.deleted", serde_json::json!({ "id": site_id }))
        .await;
    Ok(StatusCode::NO_CONTENT)
}

// ===== DEVICES =====

async fn list_devices(State(state): State<NetboxState>, tenant: TenantContext) -> Result<Json<Vec<Device>>, ApiError> {
    let session = state.sessions.acquire(tenant.tenant_id).await?;
    Ok(Json(load_all(session.as_ref(), DEVICES).await?))
}

async fn get_device(
    State(state): State<NetboxState>,
    tenant: TenantContext,
    Path(device_id): Path<String>,
) -> Result<Json<Device>, ApiError> {
    let session = state.sessions.acquire(tenant.tenant_id).await?;
    load_one(session.as_ref(), DEVICES, &device_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Device not found"))
}

async fn create_device(
    State(state): State<NetboxState>,
    tenant: TenantContext,
    Json(body): Json<DeviceCreate>,
) -> Result<(StatusCode, Json<Device>), ApiError> {
    state.authorize(&tenant, DEVICES, "create").await?;
    if body.name.trim().is_empty() {
        return Err(ApiError::bad_request("device name must not be empty"));
    }
    let session = state.sessions.acquire(tenant.tenant_id).await?;
    let device = body.into_device();
    let document = encode(&device)?;
    {
        let _guard = state.inventory_writes.lock().await;
        if session.get(SITES, &device.site_id).await?.is_none() {
            return Err(ApiError::bad_request(format!("unknown site '{}'", device.site_id)));
        }
        session.insert(DEVICES, &device.id, document.clone()).await?;
    }
    log::info!("Created device '{}' at site '{}' for tenant {}", device.id, device.site_id, tenant.tenant_id);

    state.publish(&tenant, "device.created", document).await;
    Ok((StatusCode::CREATED, Json(device)))
}

async fn delete_device(
    State(state): State<NetboxState>,
    tenant: TenantContext,
    Path(device_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.authorize(&tenant, DEVICES, "delete").await?;
    let session = state.sessions.acquire(tenant.tenant_id).await?;
    if !session.delete(DEVICES, &device_id).await? {
        return Err(ApiError::not_found("Device not found"));
    }
    state
        .publish(&tenant, "device.deleted", serde_json::json!({ "id": device_id }))
        .await;
    Ok(StatusCode::NO_CONTENT)
}
