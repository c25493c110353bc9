#![cfg(test)]

use std::net::SocketAddr;

use axum::http::StatusCode;
use serde_json::json;

use crate::config::PlatformConfig;
use crate::kernel::{Application, KernelLifecyclePhase};
use crate::plugin_system::{PluginCatalog, PluginState};
use crate::services::ServiceError;
use crate::tenant::TenantId;
use crate::tests::integration::common::{
    TENANT_A, catalog, config_with_tracker, new_tracker, recorded, send,
};

#[tokio::test]
async fn test_end_to_end_netbox_and_cartography() {
    let (id, tracker) = new_tracker();
    let mut app = Application::new(config_with_tracker(&id), catalog()).unwrap();

    let router = app.start().await.unwrap();
    assert!(app.is_started());

    {
        let registry = app.registry();
        let registry = registry.read().await;
        assert_eq!(registry.load_order(), ["netbox", "cartography"]);
        assert!(registry.is_initialized("netbox"));
        assert!(registry.is_initialized("cartography"));
    }
    assert_eq!(recorded(&tracker), vec!["init:netbox", "init:cartography"]);

    // Both plugins are mounted under their own prefix
    let (status, _) = send(&router, "GET", "/api/netbox/sites", &[("X-Tenant-ID", TENANT_A)], None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&router, "POST", "/api/cartography/sync", &[("X-Tenant-ID", TENANT_A)], None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, json!({"synced": 0}));

    // Health lists both as healthy
    let (status, health) = send(&router, "GET", "/health", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    let plugins: Vec<&str> = health["plugins"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["plugin"].as_str().unwrap())
        .collect();
    assert_eq!(plugins, vec!["netbox", "cartography"]);

    // Reverse order on the way down
    tracker.lock().unwrap().clear();
    let summary = app.stop().await;
    assert!(summary.is_clean());
    assert_eq!(recorded(&tracker), vec!["shutdown:cartography", "shutdown:netbox"]);
}

fn fail_init_of(config: &mut PlatformConfig, plugin: &str) {
    config
        .plugins
        .settings
        .entry(plugin.to_string())
        .or_default()
        .set("fail_init", true)
        .unwrap();
}

#[tokio::test]
async fn test_first_plugin_failing_leaves_rest_uninitialized() {
    let (id, tracker) = new_tracker();
    let mut config = config_with_tracker(&id);
    fail_init_of(&mut config, "netbox");

    let mut app = Application::new(config, catalog()).unwrap();
    let err = app.start().await.unwrap_err();

    assert_eq!(err.phase(), Some(KernelLifecyclePhase::Initialize));
    assert!(!app.is_started());
    assert_eq!(recorded(&tracker), vec!["init:netbox"]);
    let registry = app.registry();
    assert_eq!(registry.read().await.state("cartography"), Some(PluginState::Registered));
}

#[tokio::test]
async fn test_failure_after_partial_start_rolls_back_initialized_plugins() {
    let (id, tracker) = new_tracker();
    let mut config = config_with_tracker(&id);
    fail_init_of(&mut config, "cartography");

    let mut app = Application::new(config, catalog()).unwrap();
    let err = app.start().await.unwrap_err();

    assert_eq!(err.phase(), Some(KernelLifecyclePhase::Initialize));
    assert_eq!(
        recorded(&tracker),
        vec!["init:netbox", "init:cartography", "shutdown:netbox"]
    );
    let registry = app.registry();
    let registry = registry.read().await;
    assert_eq!(registry.state("netbox"), Some(PluginState::ShutDown));
    assert_eq!(registry.state("cartography"), Some(PluginState::Registered));
}

#[tokio::test]
async fn test_required_plugins_missing_fails_discover_phase() {
    let mut config = PlatformConfig::default();
    config.plugins.require_plugins = true;
    let mut app = Application::new(config, PluginCatalog::new()).unwrap();

    let err = app.start().await.unwrap_err();
    assert_eq!(err.phase(), Some(KernelLifecyclePhase::Discover));
}

#[tokio::test]
async fn test_empty_plugin_set_still_serves_health() {
    let mut app = Application::new(PlatformConfig::default(), PluginCatalog::new()).unwrap();
    let router = app.start().await.unwrap();

    let (status, health) = send(&router, "GET", "/health", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["plugins"], json!([]));
}

#[tokio::test]
async fn test_start_twice_is_rejected() {
    let (id, _tracker) = new_tracker();
    let mut app = Application::new(config_with_tracker(&id), catalog()).unwrap();
    app.start().await.unwrap();
    assert!(app.start().await.is_err());
}

#[tokio::test]
async fn test_stop_closes_shared_collaborators_after_plugins() {
    let (id, tracker) = new_tracker();
    let mut app = Application::new(config_with_tracker(&id), catalog()).unwrap();
    app.start().await.unwrap();

    app.stop().await;
    assert_eq!(recorded(&tracker).len(), 4);
    assert!(matches!(
        app.services().sessions.acquire(TenantId::new_v4()).await,
        Err(ServiceError::Closed { .. })
    ));

    // Second stop is a no-op for the plugins
    let again = app.stop().await;
    assert!(again.stopped.is_empty());
    assert_eq!(recorded(&tracker).len(), 4);
}

#[tokio::test]
async fn test_serve_until_signal_then_stop() {
    let (id, tracker) = new_tracker();
    let mut config = config_with_tracker(&id);
    config.server.bind = SocketAddr::from(([127, 0, 0, 1], 0));
    let app = Application::new(config, catalog()).unwrap();

    app.serve_with_shutdown(async {}).await.unwrap();

    assert_eq!(
        recorded(&tracker),
        vec!["init:netbox", "init:cartography", "shutdown:cartography", "shutdown:netbox"]
    );
}

#[tokio::test]
async fn test_serve_never_binds_when_start_fails() {
    let mut config = PlatformConfig::default();
    config.plugins.require_plugins = true;
    // An address that could not be bound; start fails first, so bind is never tried
    config.server.bind = SocketAddr::from(([192, 0, 2, 1], 1));
    let app = Application::new(config, PluginCatalog::new()).unwrap();

    let err = app.serve_with_shutdown(async {}).await.unwrap_err();
    assert_eq!(err.phase(), Some(KernelLifecyclePhase::Discover));
}

#[test]
fn test_invalid_tenant_header_setting_is_config_error() {
    let mut config = PlatformConfig::default();
    config.tenant.header = "not a header".to_string();
    assert!(matches!(
        Application::new(config, PluginCatalog::new()),
        Err(crate::kernel::Error::Config(_))
    ));
}
