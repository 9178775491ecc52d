use std::fmt::Display;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::Fragments;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::Major => "MAJOR",
            Self::Minor => "MINOR",
            Self::Warning => "WARNING",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CRITICAL" => Ok(Self::Critical),
            "MAJOR" => Ok(Self::Major),
            "MINOR" => Ok(Self::Minor),
            "WARNING" => Ok(Self::Warning),
            other => Err(format!("unknown alarm severity: {other}")),
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmStatus {
    Active,
    Acknowledged,
    Cleared,
}

impl AlarmStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Acknowledged => "ACKNOWLEDGED",
            Self::Cleared => "CLEARED",
        }
    }
}

impl std::str::FromStr for AlarmStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "ACKNOWLEDGED" => Ok(Self::Acknowledged),
            "CLEARED" => Ok(Self::Cleared),
            other => Err(format!("unknown alarm status: {other}")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Alarm {
    pub id: String,
    #[serde(rename = "type")]
    pub alarm_type: String,
    #[serde(default)]
    pub text: String,
    pub severity: Severity,
    pub status: AlarmStatus,
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

impl Alarm {
    pub fn is_cleared(&self) -> bool {
        self.status == AlarmStatus::Cleared
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AlarmCollection {
    #[serde(default)]
    pub alarms: Vec<Alarm>,
}
