use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::Fragments;

pub const BINARY_FRAGMENT: &str = "c8y_IsBinary";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<FixedOffset>>,
    #[serde(
        default,
        rename = "creationTime",
        skip_serializing_if = "Option::is_none"
    )]
    pub creation_time: Option<DateTime<FixedOffset>>,
    #[serde(flatten)]
    pub fragments: Fragments,
}

/// Attachment metadata the platform adds to an event once a binary is uploaded.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BinaryInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub length: Option<u64>,
    #[serde(default, rename = "type")]
    pub content_type: Option<String>,
}

impl Event {
    pub fn has_attachment(&self) -> bool {
        self.fragments.contains_key(BINARY_FRAGMENT)
    }

    pub fn attachment(&self) -> Option<BinaryInfo> {
        self.fragments
            .get(BINARY_FRAGMENT)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct EventCollection {
    #[serde(default)]
    pub events: Vec<Event>,
}
