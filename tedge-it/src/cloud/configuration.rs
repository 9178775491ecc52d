use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use serde_json::json;
use tedge_it_shared::Fragments;
use tedge_it_shared::configuration::{
    Configuration, DOWNLOAD_CONFIG_FRAGMENT, LOGFILE_REQUEST_FRAGMENT, LogfileRequest,
    UPLOAD_CONFIG_FRAGMENT,
};
use tedge_it_shared::inventory::ManagedObject;
use tracing::{info, warn};

use crate::cloud::DeviceManagement;
use crate::cloud::operations::AssertOperation;
use crate::error::Result;

/// An uploaded binary and the URL the device downloads it from.
#[derive(Debug, Clone)]
pub struct BinaryRef {
    pub id: String,
    pub url: String,
}

pub struct Binaries<'a> {
    ctx: &'a DeviceManagement,
}

impl<'a> Binaries<'a> {
    pub(crate) fn new(ctx: &'a DeviceManagement) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, name: &str, contents: &str) -> Result<BinaryRef> {
        let object = json!({ "name": name, "type": "text/plain" });
        let mo: ManagedObject = self
            .ctx
            .client()
            .post_file(
                "/inventory/binaries",
                &object,
                name,
                contents.as_bytes().to_vec(),
            )
            .await?;
        let url = self.ctx.client().url(&format!("/inventory/binaries/{}", mo.id));
        info!("Uploaded binary {} as {}", name, mo.id);
        Ok(BinaryRef { id: mo.id, url })
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.ctx
            .client()
            .delete(&format!("/inventory/binaries/{id}"), &vec![])
            .await
    }
}

pub struct ConfigurationManagement<'a> {
    ctx: &'a DeviceManagement,
}

impl<'a> ConfigurationManagement<'a> {
    pub(crate) fn new(ctx: &'a DeviceManagement) -> Self {
        Self { ctx }
    }

    fn fragment(name: &str, config: &Configuration) -> Result<Fragments> {
        let mut fragments = Fragments::new();
        fragments.insert(name.to_string(), serde_json::to_value(config)?);
        Ok(fragments)
    }

    /// Push a configuration file to the device (`url` must be set).
    pub async fn set_configuration(&self, config: &Configuration) -> Result<AssertOperation> {
        self.ctx
            .operations()
            .create(
                &format!("Send configuration snapshot {} to device", config.config_type),
                Self::fragment(DOWNLOAD_CONFIG_FRAGMENT, config)?,
            )
            .await
    }

    /// Ask the device to upload a configuration file.
    pub async fn get_configuration(&self, config: &Configuration) -> Result<AssertOperation> {
        self.ctx
            .operations()
            .create(
                &format!("Retrieve {} configuration snapshot from device", config.config_type),
                Self::fragment(UPLOAD_CONFIG_FRAGMENT, config)?,
            )
            .await
    }

    /// Upload `contents`, apply them and wait for success.
    ///
    /// The temporary binary is deleted whatever the outcome.
    pub async fn apply_and_wait(&self, config: &Configuration, contents: &str) -> Result<()> {
        let binaries = self.ctx.binaries();
        let binary = binaries.create(&config.config_type, contents).await?;

        let applied = async {
            let config = config.clone().with_url(binary.url.clone());
            self.set_configuration(&config)
                .await?
                .assert_success()
                .await
        }
        .await;

        if let Err(e) = binaries.delete(&binary.id).await {
            warn!("Failed to delete binary {}: {}", binary.id, e);
        }
        applied.map(|_| ())
    }
}

/// Log file request with the defaults used by the log plugin tests.
#[derive(Debug, Clone)]
pub struct LogRequest {
    pub log_type: String,
    pub date_from: DateTime<Utc>,
    pub date_to: DateTime<Utc>,
    pub maximum_lines: u32,
    pub search_text: String,
}

impl LogRequest {
    /// Last hour of `log_type`, up to 1000 lines.
    pub fn new(log_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            log_type: log_type.into(),
            date_from: now - ChronoDuration::hours(1),
            date_to: now,
            maximum_lines: 1000,
            search_text: String::new(),
        }
    }

    pub fn with_search_text(mut self, text: impl Into<String>) -> Self {
        self.search_text = text.into();
        self
    }

    pub fn with_maximum_lines(mut self, lines: u32) -> Self {
        self.maximum_lines = lines;
        self
    }

    fn to_fragment(&self) -> LogfileRequest {
        LogfileRequest {
            log_file: self.log_type.clone(),
            date_from: self.date_from.to_rfc3339_opts(SecondsFormat::Secs, true),
            date_to: self.date_to.to_rfc3339_opts(SecondsFormat::Secs, true),
            maximum_lines: self.maximum_lines,
            search_text: self.search_text.clone(),
        }
    }
}

pub struct Logs<'a> {
    ctx: &'a DeviceManagement,
}

impl<'a> Logs<'a> {
    pub(crate) fn new(ctx: &'a DeviceManagement) -> Self {
        Self { ctx }
    }

    pub async fn get_logfile(&self, request: &LogRequest) -> Result<AssertOperation> {
        let mut fragments = Fragments::new();
        fragments.insert(
            LOGFILE_REQUEST_FRAGMENT.to_string(),
            serde_json::to_value(request.to_fragment())?,
        );
        self.ctx
            .operations()
            .create(&format!("Log file request {}", request.log_type), fragments)
            .await
    }
}
