use serde::{Deserialize, Serialize};

pub const DOWNLOAD_CONFIG_FRAGMENT: &str = "c8y_DownloadConfigFile";
pub const UPLOAD_CONFIG_FRAGMENT: &str = "c8y_UploadConfigFile";
pub const LOGFILE_REQUEST_FRAGMENT: &str = "c8y_LogfileRequest";

/// A configuration type managed by the configuration plugin.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Configuration {
    #[serde(rename = "type")]
    pub config_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Configuration {
    pub fn new(config_type: impl Into<String>) -> Self {
        Self {
            config_type: config_type.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Body of the `c8y_LogfileRequest` fragment.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogfileRequest {
    #[serde(rename = "logFile")]
    pub log_file: String,
    #[serde(rename = "dateFrom")]
    pub date_from: String,
    #[serde(rename = "dateTo")]
    pub date_to: String,
    #[serde(rename = "maximumLines")]
    pub maximum_lines: u32,
    #[serde(rename = "searchText")]
    pub search_text: String,
}
