use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::data::{ConfigData, ConfigFormat, parse_str};
use crate::config::error::ConfigError;

pub const ENV_BIND: &str = "NETPLAT_BIND";
pub const ENV_PLUGINS_DIR: &str = "NETPLAT_PLUGINS_DIR";
pub const ENV_REQUIRE_PLUGINS: &str = "NETPLAT_REQUIRE_PLUGINS";
pub const ENV_INIT_TIMEOUT_SECS: &str = "NETPLAT_INIT_TIMEOUT_SECS";
pub const ENV_TENANT_HEADER: &str = "NETPLAT_TENANT_HEADER";

/// Typed configuration of the platform process
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub server: ServerSettings,
    pub plugins: PluginSettings,
    pub tenant: TenantSettings,
}

/// `[server]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Listen address of the HTTP surface
    pub bind: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
        }
    }
}

/// `[plugins]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    /// Products directory to scan. When unset the compiled-in catalog is
    /// the discovery namespace.
    pub directory: Option<PathBuf>,
    /// Refuse to start when discovery registers no plugin
    pub require_plugins: bool,
    /// Upper bound on a single plugin's initialize; 0 disables the bound
    pub init_timeout_secs: u64,
    /// Per-plugin configuration, keyed by plugin name
    pub settings: BTreeMap<String, ConfigData>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            directory: None,
            require_plugins: false,
            init_timeout_secs: 30,
            settings: BTreeMap::new(),
        }
    }
}

impl PluginSettings {
    pub fn init_timeout(&self) -> Option<Duration> {
        (self.init_timeout_secs > 0).then(|| Duration::from_secs(self.init_timeout_secs))
    }
}

/// `[tenant]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantSettings {
    /// Header carrying the tenant identifier
    pub header: String,
    /// Header carrying the authenticated subject
    pub subject_header: String,
    /// Path prefix under which requests must name a tenant
    pub isolated_prefix: String,
}

impl Default for TenantSettings {
    fn default() -> Self {
        Self {
            header: "X-Tenant-ID".to_string(),
            subject_header: "X-User-ID".to_string(),
            isolated_prefix: "/api/".to_string(),
        }
    }
}

impl PlatformConfig {
    /// Load from a JSON, YAML or TOML file chosen by extension
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = parse_str(&content, format)?;
        log::debug!("Loaded platform configuration from {:?}", path);
        Ok(config)
    }

    /// Apply `NETPLAT_*` overrides, looked up through `lookup` (usually the
    /// process environment). Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(value) = get(ENV_BIND) {
            self.server.bind = value.trim().parse().map_err(|e: std::net::AddrParseError| {
                invalid(ENV_BIND, &value, e.to_string())
            })?;
        }
        if let Some(value) = get(ENV_PLUGINS_DIR) {
            self.plugins.directory = Some(PathBuf::from(value));
        }
        if let Some(value) = get(ENV_REQUIRE_PLUGINS) {
            self.plugins.require_plugins = parse_bool(&value)
                .ok_or_else(|| invalid(ENV_REQUIRE_PLUGINS, &value, "expected a boolean".into()))?;
        }
        if let Some(value) = get(ENV_INIT_TIMEOUT_SECS) {
            self.plugins.init_timeout_secs = value.trim().parse().map_err(|e: std::num::ParseIntError| {
                invalid(ENV_INIT_TIMEOUT_SECS, &value, e.to_string())
            })?;
        }
        if let Some(value) = get(ENV_TENANT_HEADER) {
            self.tenant.header = value.trim().to_string();
        }
        Ok(())
    }
}

fn invalid(key: &str, value: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason,
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
