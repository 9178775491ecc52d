use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use testcontainers::{ContainerAsync, GenericImage};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::device::adapter::{CommandOutput, DeviceAdapter, ExecOptions};
use crate::device::archive;
use crate::error::{HarnessError, Result};
use crate::util::command::{docker, docker_output, docker_with_stdin};

const RESTART_DELAY: Duration = Duration::from_secs(1);
const EXEC_TIMEOUT: Duration = Duration::from_secs(600);

/// Docker timestamps carry nanoseconds; only whole seconds are kept.
pub fn parse_docker_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(value.trim())
        .map_err(|e| HarnessError::Runtime(format!("invalid docker timestamp {value}: {e}")))?
        .with_timezone(&Utc);
    parsed
        .with_nanosecond(0)
        .ok_or_else(|| HarnessError::Runtime(format!("invalid docker timestamp {value}")))
}

fn exec_args(container_id: &str, cmd: &str, options: &ExecOptions) -> Vec<String> {
    let mut args: Vec<String> = vec!["exec".into(), container_id.into()];
    if let Some(user) = &options.user {
        args.extend(["runuser".into(), "-u".into(), user.clone(), "--".into()]);
    }
    if options.shell {
        args.extend(["/bin/bash".to_string(), "-c".to_string(), cmd.to_string()]);
    } else {
        args.extend(cmd.split_whitespace().map(str::to_string));
    }
    args
}

fn mkdir_command(dir: &str) -> String {
    format!("mkdir -p '{dir}'")
}

/// A device running as a privileged systemd container.
pub struct DockerDeviceAdapter {
    name: String,
    container: Option<ContainerAsync<GenericImage>>,
    container_id: String,
    network: Option<String>,
    disconnected: AtomicBool,
    device_id: Option<String>,
    test_start_time: DateTime<Utc>,
    is_existing_device: bool,
}

impl DockerDeviceAdapter {
    pub fn new(
        name: impl Into<String>,
        container: ContainerAsync<GenericImage>,
        network: Option<String>,
    ) -> Self {
        let container_id = container.id().to_string();
        Self {
            name: name.into(),
            container: Some(container),
            container_id,
            network,
            disconnected: AtomicBool::new(false),
            device_id: None,
            test_start_time: Utc::now(),
            is_existing_device: false,
        }
    }

    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    fn container(&self) -> Result<&ContainerAsync<GenericImage>> {
        self.container.as_ref().ok_or_else(|| {
            HarnessError::Runtime(format!("container of {} was already removed", self.name))
        })
    }

    fn network(&self) -> Result<&str> {
        self.network.as_deref().ok_or_else(|| {
            HarnessError::Runtime(format!("device {} is not attached to a network", self.name))
        })
    }
}

#[async_trait]
impl DeviceAdapter for DockerDeviceAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    fn test_start_time(&self) -> DateTime<Utc> {
        self.test_start_time
    }

    fn set_test_start_time(&mut self, time: DateTime<Utc>) {
        self.test_start_time = time;
    }

    fn is_existing_device(&self) -> bool {
        self.is_existing_device
    }

    async fn start_time(&self) -> Result<DateTime<Utc>> {
        let started = docker(&[
            "inspect",
            "--format",
            "{{.State.StartedAt}}",
            &self.container_id,
        ])
        .await?;
        parse_docker_timestamp(&started)
    }

    async fn execute_command(&self, cmd: &str, options: &ExecOptions) -> Result<CommandOutput> {
        self.container()?;
        let result = docker_output(&exec_args(&self.container_id, cmd, options), EXEC_TIMEOUT).await?;

        let mut output = result.stdout;
        output.extend(result.stderr);
        let output = String::from_utf8_lossy(&output).to_string();

        // no code means the exec was killed by a signal
        let exit_code = result.status.code().map(i64::from).ok_or_else(|| {
            HarnessError::Runtime(format!("command on {} was terminated: {}", self.name, cmd))
        })?;

        if options.log_output {
            info!("cmd: {}, exit code: {}, stdout: {}", cmd, exit_code, output);
        } else {
            info!("cmd: {}, exit code: {}", cmd, exit_code);
        }
        Ok(CommandOutput { exit_code, output })
    }

    async fn restart(&self) -> Result<()> {
        info!("Restarting {}", self.name);
        let container = self.container()?;
        container.stop().await?;
        sleep(RESTART_DELAY).await;
        info!("Starting container {}", self.name);
        container.start().await?;
        Ok(())
    }

    async fn disconnect_network(&self) -> Result<()> {
        let network = self.network()?;
        docker(&["network", "disconnect", network, &self.container_id]).await?;
        self.disconnected.store(true, Ordering::SeqCst);
        info!("Disconnected {} from network {}", self.name, network);
        Ok(())
    }

    async fn connect_network(&self) -> Result<()> {
        let network = self.network()?;
        docker(&["network", "connect", network, &self.container_id]).await?;
        self.disconnected.store(false, Ordering::SeqCst);
        info!("Connected {} to network {}", self.name, network);
        Ok(())
    }

    async fn copy_to(&self, src: &str, dst: &str) -> Result<usize> {
        let transfer = archive::build(src, dst)?;
        self.assert_command(
            &mkdir_command(&transfer.directory),
            Some(0),
            &ExecOptions::quiet(),
        )
        .await?;

        let target = format!("{}:{}", self.container_id, transfer.directory);
        docker_with_stdin(&["cp", "-", &target], &transfer.bytes).await?;
        debug!("Copied {} file(s) from {} to {}", transfer.files, src, target);
        Ok(transfer.files)
    }

    async fn cleanup(&self) -> Result<()> {
        if self.disconnected.load(Ordering::SeqCst) && self.container.is_some() {
            self.connect_network().await?;
        }
        Ok(())
    }

    async fn remove(&mut self) -> Result<()> {
        let Some(container) = self.container.take() else {
            debug!("Container of {} already removed", self.name);
            return Ok(());
        };
        info!("Removing container {}", self.container_id);
        if let Err(e) = container.rm().await {
            warn!("Failed to remove container {}: {}", self.container_id, e);
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_docker_timestamp_drops_fraction() {
        let time = parse_docker_timestamp("2024-05-01T10:00:05.123456789Z\n").unwrap();
        assert_eq!(time.to_rfc3339(), "2024-05-01T10:00:05+00:00");
    }

    #[test]
    fn test_parse_docker_timestamp_with_offset() {
        let time = parse_docker_timestamp("2024-05-01T12:00:05.5+02:00").unwrap();
        assert_eq!(time.to_rfc3339(), "2024-05-01T10:00:05+00:00");
    }

    #[test]
    fn test_parse_docker_timestamp_rejects_garbage() {
        assert!(parse_docker_timestamp("0001-01-01").is_err());
    }

    #[test]
    fn test_mkdir_command_quotes_path() {
        assert_eq!(
            mkdir_command("/etc/tedge/my plugins"),
            "mkdir -p '/etc/tedge/my plugins'"
        );
    }

    #[test]
    fn test_exec_args() {
        assert_eq!(
            exec_args("c1", "echo hi", &ExecOptions::default()),
            vec!["exec", "c1", "/bin/bash", "-c", "echo hi"]
        );
        let plain = ExecOptions {
            shell: false,
            ..ExecOptions::default()
        };
        assert_eq!(
            exec_args("c1", "tedge  config list", &plain),
            vec!["exec", "c1", "tedge", "config", "list"]
        );
        let as_user = ExecOptions {
            user: Some("tedge".into()),
            ..ExecOptions::default()
        };
        assert_eq!(
            exec_args("c1", "id", &as_user),
            vec!["exec", "c1", "runuser", "-u", "tedge", "--", "/bin/bash", "-c", "id"]
        );
    }
}
