use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use netplat_core::api::ApiError;
use netplat_core::tenant::{TenantContext, TenantId};

use crate::{DEVICES, DeviceStatus, MonitorState, MonitoredDevice, PollerState, default_snmp_version};

pub(crate) fn router(state: MonitorState) -> Router {
    Router::new()
        .route("/devices", get(list_devices).post(add_device))
        .route("/sync", post(poll_devices))
        .route("/poller", get(poller))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct DeviceAdd {
    hostname: String,
    #[serde(default = "default_snmp_version")]
    snmp_version: String,
}

impl MonitorState {
    async fn require_poller(&self, tenant: TenantId) -> Result<PollerState, ApiError> {
        self.pollers
            .read()
            .await
            .get(&tenant)
            .cloned()
            .ok_or_else(|| ApiError::new(StatusCode::CONFLICT, "tenant not provisioned for monitoring"))
    }
}

fn decode(document: Value) -> Result<MonitoredDevice, ApiError> {
    serde_json::from_value(document).map_err(|e| ApiError::internal(format!("corrupt device record: {}", e)))
}

async fn list_devices(
    State(state): State<MonitorState>,
    tenant: TenantContext,
) -> Result<Json<Vec<MonitoredDevice>>, ApiError> {
    state.require_poller(tenant.tenant_id).await?;
    let session = state.sessions.acquire(tenant.tenant_id).await?;
    let devices = session
        .list(DEVICES)
        .await?
        .into_iter()
        .map(decode)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(devices))
}

async fn add_device(
    State(state): State<MonitorState>,
    tenant: TenantContext,
    Json(body): Json<DeviceAdd>,
) -> Result<(StatusCode, Json<MonitoredDevice>), ApiError> {
    state.require_poller(tenant.tenant_id).await?;
    let hostname = body.hostname.trim();
    if hostname.is_empty() {
        return Err(ApiError::bad_request("hostname must not be empty"));
    }
    let device = MonitoredDevice {
        hostname: hostname.to_string(),
        snmp_version: body.snmp_version,
        status: DeviceStatus::Pending,
    };
    let document = serde_json::to_value(&device).map_err(|e| ApiError::internal(e.to_string()))?;
    let session = state.sessions.acquire(tenant.tenant_id).await?;
    session.insert(DEVICES, &device.hostname, document).await?;
    log::info!("[{}] Monitoring '{}'", tenant.tenant_id, device.hostname);
    Ok((StatusCode::CREATED, Json(device)))
}

/// One polling round: every monitored device of the tenant is marked up
async fn poll_devices(
    State(state): State<MonitorState>,
    tenant: TenantContext,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state.require_poller(tenant.tenant_id).await?;
    let session = state.sessions.acquire(tenant.tenant_id).await?;

    let mut polled = 0;
    for document in session.list(DEVICES).await? {
        let mut device = decode(document)?;
        device.status = DeviceStatus::Up;
        let document = serde_json::to_value(&device).map_err(|e| ApiError::internal(e.to_string()))?;
        session.insert(DEVICES, &device.hostname, document).await?;
        polled += 1;
    }

    if let Some(poller) = state.pollers.write().await.get_mut(&tenant.tenant_id) {
        poller.polls += 1;
    }
    Ok((StatusCode::ACCEPTED, Json(json!({ "polled": polled }))))
}

async fn poller(State(state): State<MonitorState>, tenant: TenantContext) -> Result<Json<PollerState>, ApiError> {
    Ok(Json(state.require_poller(tenant.tenant_id).await?))
}
