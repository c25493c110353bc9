use serde::{Deserialize, Serialize};

/// A physical location holding devices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteCreate {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl SiteCreate {
    /// Fill in a generated id and a slug derived from the name
    pub fn into_site(self) -> Site {
        let slug = self.slug.unwrap_or_else(|| slugify(&self.name));
        Site {
            id: self.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name: self.name,
            slug,
            description: self.description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub site_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCreate {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub site_id: String,
    #[serde(default)]
    pub device_role: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
}

impl DeviceCreate {
    pub fn into_device(self) -> Device {
        Device {
            id: self.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name: self.name,
            site_id: self.site_id,
            device_role: self.device_role,
            device_type: self.device_type,
        }
    }
}

/// Lowercase, runs of non-alphanumerics collapsed to a single `-`
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
