#![cfg(test)]

use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use serde_json::json;

use crate::kernel::Application;
use crate::plugin_system::PluginContext;
use crate::services::{
    EventPublisher, GraphProvider, InMemoryEventBus, InMemoryGraphProvider, InMemorySessionProvider,
    PolicyTable,
};
use crate::tenant::TenantId;
use crate::tests::integration::common::{
    TENANT_A, TENANT_B, Tracker, catalog, config_with_tracker, new_tracker, recorded, send,
};

async fn started_app() -> (Application, Router, Tracker) {
    let (id, tracker) = new_tracker();
    let mut app = Application::new(config_with_tracker(&id), catalog()).unwrap();
    let router = app.start().await.unwrap();
    (app, router, tracker)
}

fn handler_calls(tracker: &Tracker) -> usize {
    recorded(tracker).iter().filter(|e| e.starts_with("handler:")).count()
}

#[tokio::test]
async fn test_missing_tenant_header_never_reaches_plugin() {
    let (_app, router, tracker) = started_app().await;

    let (status, body) = send(&router, "GET", "/api/netbox/sites", &[], None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"detail": "Tenant ID required"}));
    assert_eq!(handler_calls(&tracker), 0);
}

#[tokio::test]
async fn test_malformed_tenant_header_is_bad_request() {
    let (_app, router, tracker) = started_app().await;

    let (status, body) = send(
        &router,
        "GET",
        "/api/netbox/sites",
        &[("X-Tenant-ID", "acme-corp")],
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().starts_with("Invalid Tenant ID format"));
    assert_eq!(handler_calls(&tracker), 0);
}

#[tokio::test]
async fn test_tenants_only_see_their_own_data() {
    let (_app, router, _tracker) = started_app().await;

    let (status, _) = send(
        &router,
        "POST",
        "/api/netbox/sites",
        &[("X-Tenant-ID", TENANT_A)],
        Some(json!({"id": "hq", "name": "Headquarters"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, sites_a) = send(&router, "GET", "/api/netbox/sites", &[("X-Tenant-ID", TENANT_A)], None).await;
    let (_, sites_b) = send(&router, "GET", "/api/netbox/sites", &[("X-Tenant-ID", TENANT_B)], None).await;

    assert_eq!(sites_a, json!([{"id": "hq", "name": "Headquarters"}]));
    assert_eq!(sites_b, json!([]));
}

#[tokio::test]
async fn test_dependent_plugin_reads_through_same_tenant_boundary() {
    let graph = Arc::new(InMemoryGraphProvider::new());
    let services = PluginContext::in_memory();
    let services = PluginContext::new(
        Arc::new(InMemorySessionProvider::new()),
        graph.clone(),
        services.events,
        services.permissions,
    );
    let (id, _tracker) = new_tracker();
    let mut app = Application::new(config_with_tracker(&id), catalog())
        .unwrap()
        .with_services(services);
    let router = app.start().await.unwrap();

    for site in ["hq", "dc1"] {
        send(
            &router,
            "POST",
            "/api/netbox/sites",
            &[("X-Tenant-ID", TENANT_A)],
            Some(json!({ "id": site })),
        )
        .await;
    }
    let (status, body) = send(&router, "POST", "/api/cartography/sync", &[("X-Tenant-ID", TENANT_A)], None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, json!({"synced": 2}));

    let tenant_a = TenantId::from_str(TENANT_A).unwrap();
    let tenant_b = TenantId::from_str(TENANT_B).unwrap();
    assert_eq!(graph.session(tenant_a).await.unwrap().nodes(Some("Site")).await.unwrap().len(), 2);
    assert!(graph.session(tenant_b).await.unwrap().nodes(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_health_needs_no_tenant() {
    let (_app, router, _tracker) = started_app().await;
    let (status, body) = send(&router, "GET", "/health", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["plugins"][0]["initialized"], true);
}

#[tokio::test]
async fn test_health_reports_degraded_but_answers() {
    let (app, router, _tracker) = started_app().await;
    // cartography's health probe pings the graph store
    app.services().graph.close().await;

    let (status, body) = send(&router, "GET", "/health", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["plugins"][1]["plugin"], "cartography");
    assert_eq!(body["plugins"][1]["status"], "unhealthy");
}

#[tokio::test]
async fn test_unknown_plugin_prefix_is_not_found() {
    let (_app, router, _tracker) = started_app().await;
    let (status, _) = send(&router, "GET", "/api/diagrams/render", &[("X-Tenant-ID", TENANT_A)], None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tenant_creation_runs_hooks_and_publishes_event() {
    let bus = Arc::new(InMemoryEventBus::default());
    let base = PluginContext::in_memory();
    let services = PluginContext::new(base.sessions, base.graph, bus.clone(), base.permissions);
    let (id, tracker) = new_tracker();
    let mut app = Application::new(config_with_tracker(&id), catalog())
        .unwrap()
        .with_services(services);
    let router = app.start().await.unwrap();

    let uri = format!("/platform/tenants/{}", TENANT_A);
    let (status, body) = send(&router, "POST", &uri, &[], None).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["tenant_id"], TENANT_A);
    assert_eq!(body["event"], "tenant.created");
    assert_eq!(body["failures"], json!([]));
    assert!(recorded(&tracker).contains(&"tenant_created:netbox".to_string()));

    let events = bus.published().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].routing_key, format!("{}.tenant.created", TENANT_A));

    let (status, body) = send(&router, "DELETE", &uri, &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event"], "tenant.deleted");
}

#[tokio::test]
async fn test_tenant_admin_is_permission_checked() {
    let policy = Arc::new(PolicyTable::new().allow("ops", "tenants", "create"));
    let services = PluginContext::in_memory().with_permissions(policy);
    let (id, _tracker) = new_tracker();
    let mut app = Application::new(config_with_tracker(&id), catalog())
        .unwrap()
        .with_services(services);
    let router = app.start().await.unwrap();
    let uri = format!("/platform/tenants/{}", TENANT_B);

    let (status, _) = send(&router, "POST", &uri, &[], None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&router, "POST", &uri, &[("X-User-ID", "ops")], None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&router, "DELETE", &uri, &[("X-User-ID", "ops")], None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_tenant_admin_rejects_malformed_id() {
    let (_app, router, _tracker) = started_app().await;
    let (status, _) = send(&router, "POST", "/platform/tenants/not-a-uuid", &[], None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cors_preflight_is_answered() {
    let (_app, router, _tracker) = started_app().await;
    let (status, _) = send(
        &router,
        "OPTIONS",
        "/health",
        &[
            ("Origin", "https://console.example.net"),
            ("Access-Control-Request-Method", "GET"),
        ],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_event_bus_is_closed_on_stop() {
    let bus = Arc::new(InMemoryEventBus::default());
    let base = PluginContext::in_memory();
    let services = PluginContext::new(base.sessions, base.graph, bus.clone(), base.permissions);
    let (id, _tracker) = new_tracker();
    let mut app = Application::new(config_with_tracker(&id), catalog())
        .unwrap()
        .with_services(services);
    app.start().await.unwrap();
    app.stop().await;

    assert!(bus.publish("after.stop", json!({})).await.is_err());
}
