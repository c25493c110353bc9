/// Application name
pub const APP_NAME: &str = "netplat";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "netplat.toml";

/// Path prefix under which each plugin router is nested as `/api/{name}`
pub const PLUGIN_MOUNT_PREFIX: &str = "/api";
