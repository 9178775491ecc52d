pub mod alarm;
pub mod configuration;
pub mod event;
pub mod inventory;
pub mod measurement;
pub mod operation;
pub mod software;

/// Free-form JSON extensions attached to platform objects.
pub type Fragments = serde_json::Map<String, serde_json::Value>;
