pub mod env_file;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::assertion::RetryConfig;
use crate::error::{HarnessError, Result};

pub const ENV_FILE_VAR: &str = "TEDGE_IT_ENV_FILE";
pub const VARIABLES_VAR: &str = "TEDGE_IT_VARIABLES";
pub const OUTPUT_DIR_VAR: &str = "TEDGE_IT_OUTPUT_DIR";

fn default_image() -> String {
    "debian-systemd".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_poll_interval_secs() -> u64 {
    2
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("test_output")
}
fn default_prefix() -> String {
    "STC".to_string()
}
fn default_bootstrap_script() -> String {
    "/demo/bootstrap.sh".to_string()
}

/// Cloud tenant credentials.
#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub base_url: String,
    pub tenant: String,
    pub user: String,
    pub password: String,
    pub trust_invalid_server_cert: bool,
}

impl CloudConfig {
    /// `<tenant>/<user>`, or the bare user if the tenant is unknown.
    pub fn username(&self) -> String {
        if self.tenant.is_empty() {
            self.user.clone()
        } else {
            format!("{}/{}", self.tenant, self.user)
        }
    }
}

/// Test variables file (`variables.*.json`).
#[derive(Debug, Deserialize, Clone)]
pub struct TestVariables {
    #[serde(rename = "PREFIX", default = "default_prefix")]
    pub prefix: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for TestVariables {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            extra: BTreeMap::new(),
        }
    }
}

impl TestVariables {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::Config(format!(
                "failed to read variables file {}: {e}",
                path.display()
            ))
        })?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub cloud: Option<CloudConfig>,
    pub image: String,
    pub network: Option<String>,
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub output_dir: PathBuf,
    pub test_id: String,
    pub env_file: Option<PathBuf>,
    pub bootstrap_script: String,
    pub variables: TestVariables,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            cloud: None,
            image: default_image(),
            network: None,
            timeout_secs: default_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            output_dir: default_output_dir(),
            test_id: "local".to_string(),
            env_file: None,
            bootstrap_script: default_bootstrap_script(),
            variables: TestVariables::default(),
        }
    }
}

impl HarnessConfig {
    /// Load from the process environment, after merging the env file if it exists.
    ///
    /// The env file is `TEDGE_IT_ENV_FILE` or `.env`. Variables already
    /// present in the environment win over the file.
    pub fn load() -> Result<Self> {
        Self::load_with(std::env::vars())
    }

    fn load_with<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let process: BTreeMap<String, String> = vars.into_iter().collect();
        let env_path = process
            .get(ENV_FILE_VAR)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".env"));

        let mut merged = if env_path.exists() {
            env_file::load(&env_path)?
        } else {
            warn!("No env file found at {}, using process environment only", env_path.display());
            BTreeMap::new()
        };
        merged.extend(process);

        let mut config = Self::from_lookup(|key| merged.get(key).cloned())?;
        if config.env_file.is_none() && env_path.exists() {
            config.env_file = Some(env_path);
        }
        Ok(config)
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cloud = match lookup("C8Y_BASEURL") {
            Some(base_url) if !base_url.is_empty() => Some(CloudConfig {
                base_url: normalize_base_url(&base_url),
                tenant: lookup("C8Y_TENANT").unwrap_or_default(),
                user: lookup("C8Y_USER").ok_or_else(|| {
                    HarnessError::Config("C8Y_USER must be set with C8Y_BASEURL".into())
                })?,
                password: lookup("C8Y_PASSWORD").ok_or_else(|| {
                    HarnessError::Config("C8Y_PASSWORD must be set with C8Y_BASEURL".into())
                })?,
                trust_invalid_server_cert: parse_bool(lookup("C8Y_INSECURE")),
            }),
            _ => None,
        };

        let variables = match lookup(VARIABLES_VAR) {
            Some(path) if !path.is_empty() => TestVariables::load(Path::new(&path))?,
            _ => TestVariables::default(),
        };

        let config = Self {
            cloud,
            image: lookup("TEDGE_IT_IMAGE").unwrap_or(defaults.image),
            network: lookup("TEDGE_IT_NETWORK").filter(|n| !n.is_empty()),
            timeout_secs: parse_u64(lookup("TEDGE_IT_TIMEOUT_SECS"), defaults.timeout_secs)?,
            poll_interval_secs: parse_u64(
                lookup("TEDGE_IT_POLL_INTERVAL_SECS"),
                defaults.poll_interval_secs,
            )?,
            output_dir: lookup(OUTPUT_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            test_id: lookup("TEDGE_IT_TEST_ID")
                .filter(|id| !id.is_empty())
                .unwrap_or_else(new_run_id),
            env_file: lookup(ENV_FILE_VAR)
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
            bootstrap_script: lookup("TEDGE_IT_BOOTSTRAP").unwrap_or(defaults.bootstrap_script),
            variables,
        };

        info!(
            image = %config.image,
            cloud = config.cloud.as_ref().map(|c| c.base_url.as_str()).unwrap_or("<none>"),
            "Harness configuration loaded"
        );
        Ok(config)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(
            Duration::from_secs(self.timeout_secs),
            Duration::from_secs(self.poll_interval_secs),
        )
    }

    pub fn require_cloud(&self) -> Result<&CloudConfig> {
        self.cloud
            .as_ref()
            .ok_or_else(|| HarnessError::Config("C8Y_BASEURL is not set".into()))
    }
}

/// Short random id so log files of separate runs never collide.
fn new_run_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn normalize_base_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

fn parse_bool(value: Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("1" | "true" | "yes")
    )
}

fn parse_u64(value: Option<String>, default: u64) -> Result<u64> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| HarnessError::Config(format!("expected a number, got {v:?}"))),
        None => Ok(default),
    }
}
