use semver::Version;
use serde::Serialize;

/// Immutable descriptor of a plugin, fixed at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginMetadata {
    /// Unique key within a registry; also the `/api/{name}` mount prefix
    pub name: String,
    pub version: Version,
    pub description: String,
    pub author: String,
    /// Plugins that must be initialized before this one, in declaration order
    pub requires: Vec<String>,
    /// Informational capability tags
    pub capabilities: Vec<String>,
}

impl PluginMetadata {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            description: String::new(),
            author: String::new(),
            requires: Vec::new(),
            capabilities: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn requires<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn capabilities<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Check that a plugin name can serve as a registry key and a URL path
/// segment: ASCII letters, digits, `-`, `_` and `.` only
pub fn validate_plugin_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name must not be empty".to_string());
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(format!("name contains invalid character {:?}", c));
    }
    Ok(())
}
