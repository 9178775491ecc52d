use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::Fragments;

pub const DEFAULT_IDENTITY_TYPE: &str = "c8y_Serial";

/// Cloud-side representation of a device.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ManagedObject {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(
        default,
        rename = "childDevices",
        skip_serializing_if = "Option::is_none"
    )]
    pub child_devices: Option<ReferenceCollection>,
    #[serde(flatten)]
    pub fragments: Fragments,
}

impl ManagedObject {
    pub fn child_device_names(&self) -> Vec<String> {
        self.child_devices
            .as_ref()
            .map(|c| {
                c.references
                    .iter()
                    .filter_map(|r| r.managed_object.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_fragment(&self, name: &str) -> bool {
        self.fragments.contains_key(name)
    }
}

impl Display for ManagedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", json)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ReferenceCollection {
    #[serde(default)]
    pub references: Vec<Reference>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Reference {
    #[serde(rename = "managedObject")]
    pub managed_object: ObjectRef,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ObjectRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Mapping between a device's own identifier and its managed object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExternalId {
    #[serde(rename = "externalId")]
    pub external_id: String,
    #[serde(rename = "type")]
    pub id_type: String,
    #[serde(rename = "managedObject")]
    pub managed_object: ObjectRef,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ManagedObjectCollection {
    #[serde(rename = "managedObjects", default)]
    pub managed_objects: Vec<ManagedObject>,
}
