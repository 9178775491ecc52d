use std::fmt::Display;

use chrono::{DateTime, Utc};
use tedge_it_shared::alarm::{Alarm, AlarmCollection, AlarmStatus, Severity};
use tracing::info;

use crate::assertion::{self, CountRange};
use crate::cloud::DeviceManagement;
use crate::error::Result;

/// Server-side and client-side criteria for alarm lookups.
#[derive(Debug, Clone, Default)]
pub struct AlarmFilter {
    pub alarm_type: Option<String>,
    pub severity: Option<Severity>,
    pub status: Option<AlarmStatus>,
    pub resolved: Option<bool>,
    /// Exact match on `text`, applied after fetching.
    pub expected_text: Option<String>,
    pub after: Option<DateTime<Utc>>,
}

impl AlarmFilter {
    pub fn with_type(mut self, alarm_type: impl Into<String>) -> Self {
        self.alarm_type = Some(alarm_type.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_status(mut self, status: AlarmStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn resolved(mut self, resolved: bool) -> Self {
        self.resolved = Some(resolved);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.expected_text = Some(text.into());
        self
    }

    pub fn after(mut self, time: DateTime<Utc>) -> Self {
        self.after = Some(time);
        self
    }

    fn matches(&self, alarm: &Alarm) -> bool {
        self.expected_text
            .as_deref()
            .is_none_or(|text| alarm.text == text)
    }
}

impl Display for AlarmFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "type={:?}, severity={:?}, status={:?}, resolved={:?}, text={:?}",
            self.alarm_type, self.severity, self.status, self.resolved, self.expected_text
        )
    }
}

pub struct Alarms<'a> {
    ctx: &'a DeviceManagement,
}

impl<'a> Alarms<'a> {
    pub(crate) fn new(ctx: &'a DeviceManagement) -> Self {
        Self { ctx }
    }

    async fn fetch(&self, filter: &AlarmFilter) -> Result<Vec<Alarm>> {
        let mut query = self.ctx.source_query(filter.after)?;
        if let Some(alarm_type) = &filter.alarm_type {
            query.push(("type", alarm_type.clone()));
        }
        if let Some(severity) = filter.severity {
            query.push(("severity", severity.as_str().to_string()));
        }
        if let Some(status) = filter.status {
            query.push(("status", status.as_str().to_string()));
        }
        if let Some(resolved) = filter.resolved {
            query.push(("resolved", resolved.to_string()));
        }

        let collection: AlarmCollection = self.ctx.client().get_json("/alarm/alarms", &query).await?;
        Ok(collection
            .alarms
            .into_iter()
            .filter(|alarm| filter.matches(alarm))
            .collect())
    }

    /// Wait until the number of matching alarms lies in `range`.
    pub async fn assert_count(&self, filter: &AlarmFilter, range: CountRange) -> Result<Vec<Alarm>> {
        let alarms = assertion::assert_count(
            self.ctx.retry_config(),
            "alarms",
            range,
            filter,
            || self.fetch(filter),
        )
        .await?;
        info!("Found {} matching alarm(s)", alarms.len());
        Ok(alarms)
    }

    pub async fn assert_exists(&self, id: &str) -> Result<Alarm> {
        let path = format!("/alarm/alarms/{id}");
        assertion::wait_for_result(self.ctx.retry_config(), &format!("alarm {id}"), || {
            self.ctx.client().find_json::<Alarm>(&path)
        })
        .await
    }
}
