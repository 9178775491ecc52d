use std::collections::BTreeMap;
use std::path::PathBuf;

use testcontainers::core::Mount;
use testcontainers::runners::AsyncRunner;
use testcontainers::{GenericImage, ImageExt};
use tokio::sync::OnceCell;
use tracing::info;

use crate::config::env_file;
use crate::device::docker::DockerDeviceAdapter;
use crate::error::{HarnessError, Result};
use crate::util::command::docker;
use crate::util::names::NameRegistry;

pub const DEFAULT_TEST_SUITE: &str = "inttest";

/// Per-device container settings.
#[derive(Debug, Clone)]
pub struct DeviceOptions {
    pub env_file: Option<PathBuf>,
    /// Container name prefix.
    pub test_suite: String,
    /// Applied after the env file, so these win.
    pub env: BTreeMap<String, String>,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            env_file: None,
            test_suite: DEFAULT_TEST_SUITE.to_string(),
            env: BTreeMap::new(),
        }
    }
}

/// `name[:tag]`, keeping registry ports out of the tag.
pub fn split_image(image: &str) -> (&str, &str) {
    match image.rsplit_once(':') {
        Some((name, tag)) if !tag.contains('/') => (name, tag),
        _ => (image, "latest"),
    }
}

/// Creates docker-backed devices and hands out unique names.
pub struct DockerDeviceFactory {
    names: NameRegistry,
    network: Option<String>,
    network_ready: OnceCell<()>,
}

impl DockerDeviceFactory {
    pub fn new(network: Option<String>) -> Self {
        Self {
            names: NameRegistry::new(),
            network,
            network_ready: OnceCell::new(),
        }
    }

    pub fn network(&self) -> Option<&str> {
        self.network.as_deref()
    }

    /// `<prefix>-<adjective>-<noun>-<4 hex>`, never repeated within this factory.
    pub fn generate_name(&self, prefix: &str) -> String {
        self.names.generate(prefix)
    }

    async fn ensure_network(&self) -> Result<()> {
        let Some(network) = self.network.as_deref() else {
            return Ok(());
        };
        self.network_ready
            .get_or_try_init(|| async {
                if docker(&["network", "inspect", network]).await.is_ok() {
                    return Ok(());
                }
                info!("Creating docker network {}", network);
                docker(&["network", "create", network]).await.map(|_| ())
            })
            .await
            .map(|_| ())
    }

    /// Start a privileged systemd container for the device `name`.
    pub async fn create_device(
        &self,
        name: &str,
        image: &str,
        options: &DeviceOptions,
    ) -> Result<DockerDeviceAdapter> {
        self.names.reserve(name);
        self.ensure_network().await?;

        let mut env = match &options.env_file {
            Some(path) => env_file::load(path)?,
            None => BTreeMap::new(),
        };
        env.extend(options.env.clone());
        env.insert("DEVICE_ID".to_string(), name.to_string());

        let (image_name, tag) = split_image(image);
        let container_name = format!("{}-{}", options.test_suite, name);

        let mut request = GenericImage::new(image_name, tag)
            .with_privileged(true)
            .with_mount(Mount::bind_mount("/sys/fs/cgroup", "/sys/fs/cgroup"))
            .with_container_name(&container_name);
        for (key, value) in env {
            request = request.with_env_var(key, value);
        }
        if let Some(network) = &self.network {
            request = request.with_network(network);
        }

        info!("Starting container {} from {}", container_name, image);
        let container = request.start().await.map_err(|e| {
            HarnessError::Runtime(format!("failed to start {container_name}: {e}"))
        })?;

        Ok(DockerDeviceAdapter::new(name, container, self.network.clone()).with_device_id(name))
    }
}
