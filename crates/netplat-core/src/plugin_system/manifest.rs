use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::fs;

use crate::config::{ConfigData, ConfigFormat, parse_str};
use crate::plugin_system::error::PluginSystemError;

/// File stem of the per-product manifest (`plugin.toml`, `plugin.json`, ...)
pub const MANIFEST_STEM: &str = "plugin";

/// Describes one product directory of the products namespace
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginManifest {
    /// Catalog key of the constructor to use; defaults to the directory name
    #[serde(default)]
    pub entry: Option<String>,

    /// Disabled products are skipped without error
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,

    /// Configuration handed to the constructor
    #[serde(default)]
    pub config: ConfigData,
}

fn enabled_by_default() -> bool {
    true
}

impl PluginManifest {
    /// Locate the manifest inside `dir`, trying each enabled format in turn
    pub async fn find(dir: &Path) -> Option<PathBuf> {
        for format in ConfigFormat::enabled() {
            for ext in format.extensions() {
                let path = dir.join(format!("{}.{}", MANIFEST_STEM, ext));
                if fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false) {
                    return Some(path);
                }
            }
        }
        None
    }

    /// Load a plugin manifest from a file asynchronously
    pub async fn load(path: &Path) -> Result<Self, PluginSystemError> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| PluginSystemError::ManifestError {
            path: path.to_path_buf(),
            message: "unsupported manifest format".to_string(),
        })?;
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PluginSystemError::ManifestError {
                path: path.to_path_buf(),
                message: format!("Failed to read manifest: {}", e),
            })?;
        parse_str(&content, format).map_err(|e| PluginSystemError::ManifestError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Constructor key, falling back to the product directory name
    pub fn entry_or<'a>(&'a self, dir_name: &'a str) -> &'a str {
        self.entry.as_deref().filter(|e| !e.is_empty()).unwrap_or(dir_name)
    }
}
