use serde::{Deserialize, Serialize};

pub const SOFTWARE_LIST_FRAGMENT: &str = "c8y_SoftwareList";

/// A software package as referenced by software-management operations.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Software {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub url: String,
    #[serde(
        default,
        rename = "softwareType",
        skip_serializing_if = "Option::is_none"
    )]
    pub software_type: Option<String>,
}

impl Software {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Parse `name[,version[,url]]`.
    pub fn parse(item: &str) -> Option<Self> {
        let mut parts = item.splitn(3, ',').map(str::trim);
        let name = parts.next().filter(|n| !n.is_empty())?;
        Some(Self {
            name: name.to_string(),
            version: parts.next().unwrap_or_default().to_string(),
            url: parts.next().unwrap_or_default().to_string(),
            software_type: None,
        })
    }
}

/// Entry of the `c8y_SoftwareUpdate` fragment.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SoftwareUpdate {
    pub name: String,
    pub version: String,
    pub url: String,
    pub action: SoftwareAction,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SoftwareAction {
    Install,
    Delete,
}

impl SoftwareUpdate {
    pub fn new(software: &Software, action: SoftwareAction) -> Self {
        Self {
            name: software.name.clone(),
            version: software.version.clone(),
            url: software.url.clone(),
            action,
        }
    }
}
