//! Device-management platform context and its collections.
//!
//! A [`DeviceManagement`] is built explicitly per device under test and
//! handed to whoever needs it. Every collection is a short-lived borrowed
//! view, so retries and the bound device id are always read from one place.

pub mod alarms;
pub mod certificates;
pub mod client;
pub mod configuration;
pub mod events;
pub mod identity;
pub mod inventory;
pub mod measurements;
pub mod operations;
pub mod realtime;
pub mod software;

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use crate::assertion::RetryConfig;
use crate::config::CloudConfig;
use crate::error::{HarnessError, Result};

pub use client::{CloudClient, Query};

use alarms::Alarms;
use certificates::{TrustedCertificates, Users};
use configuration::{Binaries, ConfigurationManagement, Logs};
use events::Events;
use identity::Identity;
use inventory::Inventory;
use measurements::Measurements;
use operations::{DeviceControl, Restart, Shell};
use software::SoftwareManagement;

const PAGE_SIZE: usize = 2000;

/// Platform timestamps are sent with millisecond precision and a `Z` suffix.
pub(crate) fn format_date(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone)]
pub struct DeviceManagement {
    client: CloudClient,
    device_id: Option<String>,
    retries: RetryConfig,
    test_start_time: DateTime<Utc>,
}

impl DeviceManagement {
    pub fn new(client: CloudClient, retries: RetryConfig) -> Self {
        Self {
            client,
            device_id: None,
            retries,
            test_start_time: Utc::now(),
        }
    }

    pub fn from_config(config: &CloudConfig, retries: RetryConfig) -> Result<Self> {
        Ok(Self::new(CloudClient::new(config)?, retries))
    }

    pub fn client(&self) -> &CloudClient {
        &self.client
    }

    /// Managed object id of the bound device.
    pub fn device_id(&self) -> Result<&str> {
        self.device_id.as_deref().ok_or_else(|| {
            HarnessError::DeviceNotFound("no managed object is bound to this context".into())
        })
    }

    pub fn set_device_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        debug!("Binding cloud context to managed object {}", id);
        self.device_id = Some(id);
    }

    pub fn configure_retries(&mut self, timeout: Duration, interval: Duration) {
        self.retries = RetryConfig::new(timeout, interval);
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retries
    }

    pub fn test_start_time(&self) -> DateTime<Utc> {
        self.test_start_time
    }

    pub fn set_test_start_time(&mut self, time: DateTime<Utc>) {
        self.test_start_time = time;
    }

    /// `source`, `dateFrom` and `pageSize` for record collections.
    ///
    /// Records created before the test started are never visible.
    pub(crate) fn source_query(&self, after: Option<DateTime<Utc>>) -> Result<Query> {
        let date_from = after.unwrap_or(self.test_start_time);
        Ok(vec![
            ("source", self.device_id()?.to_string()),
            ("dateFrom", format_date(&date_from)),
            ("pageSize", PAGE_SIZE.to_string()),
        ])
    }

    /// Link to the device in the device-management web app.
    pub fn device_url(&self, id: &str) -> String {
        format!(
            "{}/apps/devicemanagement/index.html#/device/{}/events",
            self.client.base_url(),
            id
        )
    }

    pub fn alarms(&self) -> Alarms<'_> {
        Alarms::new(self)
    }

    pub fn events(&self) -> Events<'_> {
        Events::new(self)
    }

    pub fn measurements(&self) -> Measurements<'_> {
        Measurements::new(self)
    }

    pub fn inventory(&self) -> Inventory<'_> {
        Inventory::new(self)
    }

    pub fn identity(&self) -> Identity<'_> {
        Identity::new(self)
    }

    pub fn operations(&self) -> DeviceControl<'_> {
        DeviceControl::new(self)
    }

    pub fn software_management(&self) -> SoftwareManagement<'_> {
        SoftwareManagement::new(self)
    }

    pub fn configuration(&self) -> ConfigurationManagement<'_> {
        ConfigurationManagement::new(self)
    }

    pub fn logs(&self) -> Logs<'_> {
        Logs::new(self)
    }

    pub fn binaries(&self) -> Binaries<'_> {
        Binaries::new(self)
    }

    pub fn restart(&self) -> Restart<'_> {
        Restart::new(self)
    }

    pub fn shell(&self) -> Shell<'_> {
        Shell::new(self)
    }

    pub fn trusted_certificates(&self) -> TrustedCertificates<'_> {
        TrustedCertificates::new(self)
    }

    pub fn users(&self) -> Users<'_> {
        Users::new(self)
    }
}
