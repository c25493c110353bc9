//! # Netplat Core Configuration
//!
//! Configuration for the platform process and for individual plugins.
//!
//! - **[`data`]**: [`ConfigData`], the loosely typed key/value map handed to
//!   plugin constructors, and [`ConfigFormat`] (JSON, YAML, TOML) detection.
//! - **[`platform`]**: [`PlatformConfig`], the typed process configuration
//!   with its `[server]`, `[plugins]` and `[tenant]` sections and the
//!   `NETPLAT_*` environment overrides.
//! - **[`error`]**: [`ConfigError`].
pub mod data;
pub mod error;
pub mod platform;

pub use data::{ConfigData, ConfigFormat, parse_str};
pub use error::ConfigError;
pub use platform::{PlatformConfig, PluginSettings, ServerSettings, TenantSettings};
