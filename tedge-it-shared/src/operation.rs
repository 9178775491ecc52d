use std::fmt::Display;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::Fragments;

/// Operation status lifecycle: PENDING -> EXECUTING -> {SUCCESSFUL, FAILED}.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Pending,
    Executing,
    Successful,
    Failed,
}

impl OperationStatus {
    /// Terminal states are final.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Successful | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Executing => "EXECUTING",
            Self::Successful => "SUCCESSFUL",
            Self::Failed => "FAILED",
        }
    }
}

impl Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Operation {
    pub id: String,
    #[serde(rename = "deviceId")]
    pub device_id: String,
    pub status: OperationStatus,
    #[serde(
        default,
        rename = "failureReason",
        skip_serializing_if = "Option::is_none"
    )]
    pub failure_reason: Option<String>,
    #[serde(
        default,
        rename = "creationTime",
        skip_serializing_if = "Option::is_none"
    )]
    pub creation_time: Option<DateTime<FixedOffset>>,
    #[serde(flatten)]
    pub fragments: Fragments,
}

/// Body used to create a new operation for a device.
#[derive(Debug, Serialize, Clone)]
pub struct NewOperation {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub fragments: Fragments,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct OperationCollection {
    #[serde(default)]
    pub operations: Vec<Operation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal_states() {
        assert!(!OperationStatus::Pending.is_done());
        assert!(!OperationStatus::Executing.is_done());
        assert!(OperationStatus::Successful.is_done());
        assert!(OperationStatus::Failed.is_done());
    }

    #[test]
    fn test_operation_parsing() {
        let op: Operation = serde_json::from_str(
            r#"{
                "id": "7",
                "deviceId": "42",
                "status": "FAILED",
                "failureReason": "package not found",
                "creationTime": "2024-03-01T10:00:00.123+01:00",
                "c8y_SoftwareUpdate": []
            }"#,
        )
        .unwrap();
        assert_eq!(op.status, OperationStatus::Failed);
        assert_eq!(op.failure_reason.as_deref(), Some("package not found"));
        assert!(op.fragments.contains_key("c8y_SoftwareUpdate"));
    }

    #[test]
    fn test_new_operation_flattens_fragments() {
        let mut fragments = Fragments::new();
        fragments.insert("c8y_Restart".into(), serde_json::json!({}));
        let body = NewOperation {
            device_id: "42".into(),
            description: None,
            fragments,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["deviceId"], "42");
        assert!(json.get("c8y_Restart").is_some());
        assert!(json.get("description").is_none());
    }
}
