use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::config::{ConfigData, PluginSettings};
use crate::plugin_system::error::{PluginSystemError, panic_message};
use crate::plugin_system::manifest::PluginManifest;
use crate::plugin_system::registry::PluginRegistry;
use crate::plugin_system::traits::Plugin;

/// Conventional constructor every product crate exports as `create_plugin`
pub type PluginConstructor = fn(&ConfigData) -> Result<Box<dyn Plugin>, PluginSystemError>;

/// Compile-time plugin table: ordered `(name, constructor)` pairs
#[derive(Clone, Default)]
pub struct PluginCatalog {
    entries: Vec<(String, PluginConstructor)>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`PluginCatalog::add`]
    pub fn with(mut self, name: &str, constructor: PluginConstructor) -> Self {
        self.add(name, constructor);
        self
    }

    /// Add an entry. The first entry for a name wins.
    pub fn add(&mut self, name: &str, constructor: PluginConstructor) {
        if self.get(name).is_some() {
            log::warn!("Plugin catalog already has an entry named '{}'; ignoring duplicate", name);
            return;
        }
        self.entries.push((name.to_string(), constructor));
    }

    pub fn get(&self, name: &str) -> Option<PluginConstructor> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, c)| *c)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// What one discovery pass produced
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Names of registered plugins, in registration order
    pub registered: Vec<String>,
    /// Candidates whose manifest disabled them
    pub disabled: Vec<String>,
    /// One entry per candidate that could not be registered
    pub failures: Vec<PluginSystemError>,
}

impl DiscoveryReport {
    /// Fail-hard switch for contexts where an empty plugin set is a fault
    pub fn ensure_non_empty(&self) -> Result<(), PluginSystemError> {
        if self.registered.is_empty() {
            return Err(PluginSystemError::DiscoveryError {
                candidate: "*".to_string(),
                message: format!(
                    "no plugins discovered ({} candidate failures)",
                    self.failures.len()
                ),
            });
        }
        Ok(())
    }
}

/// A candidate resolved to a constructor and its configuration
struct Candidate {
    label: String,
    constructor: PluginConstructor,
    config: ConfigData,
}

/// Finds plugin implementations and registers one instance of each.
///
/// Without a products directory the catalog itself is the namespace. With
/// one, every immediate sub-directory is a candidate described by its
/// `plugin.{toml,json,yaml}` manifest and resolved against the catalog.
/// A broken candidate is recorded and skipped; it never stops the others.
#[derive(Debug, Clone)]
pub struct PluginDiscovery {
    catalog: PluginCatalog,
    directory: Option<PathBuf>,
    settings: BTreeMap<String, ConfigData>,
}

impl PluginDiscovery {
    pub fn new(catalog: PluginCatalog) -> Self {
        Self {
            catalog,
            directory: None,
            settings: BTreeMap::new(),
        }
    }

    /// Discovery configured from the `[plugins]` section
    pub fn from_settings(catalog: PluginCatalog, settings: &PluginSettings) -> Self {
        Self::new(catalog)
            .with_directory(settings.directory.clone())
            .with_settings(settings.settings.clone())
    }

    pub fn with_directory(mut self, directory: Option<PathBuf>) -> Self {
        self.directory = directory;
        self
    }

    /// Per-plugin configuration; overrides manifest values key by key
    pub fn with_settings(mut self, settings: BTreeMap<String, ConfigData>) -> Self {
        self.settings = settings;
        self
    }

    pub fn catalog(&self) -> &PluginCatalog {
        &self.catalog
    }

    /// Run one discovery pass, registering every constructible candidate
    pub async fn discover_into(&self, registry: &mut PluginRegistry) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        let candidates = match &self.directory {
            Some(dir) => self.directory_candidates(dir, &mut report).await,
            None => self.catalog_candidates(),
        };

        for candidate in candidates {
            match Self::construct(&candidate) {
                Ok((plugin, name)) => match registry.register(plugin) {
                    Ok(()) => {
                        log::info!("Discovered plugin '{}' from {}", name, candidate.label);
                        report.registered.push(name);
                    }
                    Err(e) => {
                        log::warn!("Skipping candidate {}: {}", candidate.label, e);
                        report.failures.push(e);
                    }
                },
                Err(e) => {
                    log::warn!("Skipping candidate {}: {}", candidate.label, e);
                    report.failures.push(e);
                }
            }
        }

        log::info!(
            "Plugin discovery finished: {} registered, {} disabled, {} failed",
            report.registered.len(),
            report.disabled.len(),
            report.failures.len()
        );
        report
    }

    fn construct(candidate: &Candidate) -> Result<(Box<dyn Plugin>, String), PluginSystemError> {
        let constructor = candidate.constructor;
        let config = &candidate.config;
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let plugin = constructor(config)?;
            let name = plugin.metadata().name;
            Ok::<_, PluginSystemError>((plugin, name))
        }));
        match outcome {
            Ok(result) => result.map_err(|e| PluginSystemError::DiscoveryError {
                candidate: candidate.label.clone(),
                message: format!("constructor failed: {}", e),
            }),
            Err(payload) => Err(PluginSystemError::DiscoveryError {
                candidate: candidate.label.clone(),
                message: format!("constructor panicked: {}", panic_message(payload.as_ref())),
            }),
        }
    }

    fn config_for(&self, key: &str, base: ConfigData) -> ConfigData {
        let mut config = base;
        if let Some(overrides) = self.settings.get(key) {
            config.merge(overrides);
        }
        config
    }

    fn catalog_candidates(&self) -> Vec<Candidate> {
        self.catalog
            .entries
            .iter()
            .map(|(name, constructor)| Candidate {
                label: format!("catalog entry '{}'", name),
                constructor: *constructor,
                config: self.config_for(name, ConfigData::new()),
            })
            .collect()
    }

    async fn directory_candidates(&self, dir: &Path, report: &mut DiscoveryReport) -> Vec<Candidate> {
        let product_dirs = match scan_product_dirs(dir).await {
            Ok(dirs) => dirs,
            Err(e) => {
                log::error!("Cannot scan products directory {:?}: {}", dir, e);
                report.failures.push(e);
                return Vec::new();
            }
        };

        let mut candidates = Vec::with_capacity(product_dirs.len());
        for (dir_name, path) in product_dirs {
            let Some(manifest_path) = PluginManifest::find(&path).await else {
                report.failures.push(PluginSystemError::ManifestError {
                    path: path.clone(),
                    message: "no plugin manifest found".to_string(),
                });
                log::warn!("Skipping product directory {:?}: no plugin manifest", path);
                continue;
            };
            let manifest = match PluginManifest::load(&manifest_path).await {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("Skipping product directory {:?}: {}", path, e);
                    report.failures.push(e);
                    continue;
                }
            };
            if !manifest.enabled {
                log::info!("Product '{}' is disabled by its manifest", dir_name);
                report.disabled.push(dir_name);
                continue;
            }

            let entry = manifest.entry_or(&dir_name).to_string();
            let Some(constructor) = self.catalog.get(&entry) else {
                let e = PluginSystemError::DiscoveryError {
                    candidate: dir_name.clone(),
                    message: format!("no plugin constructor named '{}'", entry),
                };
                log::warn!("Skipping product directory {:?}: {}", path, e);
                report.failures.push(e);
                continue;
            };
            candidates.push(Candidate {
                label: format!("product directory '{}'", dir_name),
                constructor,
                config: self.config_for(&entry, manifest.config),
            });
        }
        candidates
    }
}

/// Immediate sub-directories of `dir`, sorted by name, skipping names that
/// start with `_` or `.`
pub async fn scan_product_dirs(dir: &Path) -> Result<Vec<(String, PathBuf)>, PluginSystemError> {
    let io_err = |e: std::io::Error| PluginSystemError::DiscoveryError {
        candidate: dir.display().to_string(),
        message: e.to_string(),
    };
    let mut read_dir = fs::read_dir(dir).await.map_err(io_err)?;

    let mut dirs = Vec::new();
    while let Some(entry) = read_dir.next_entry().await.map_err(io_err)? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('_') || name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        let is_dir = fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false);
        if is_dir {
            dirs.push((name, path));
        } else {
            log::debug!("Ignoring non-directory entry {:?} in products directory", path);
        }
    }
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(dirs)
}
