use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::{HarnessError, Result, command_snippet};

pub const LOG_COMMAND: &str =
    "journalctl --lines 100000 --no-pager -u 'tedge*' -u 'c8y*' -u mosquitto";

#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Run through `/bin/bash -c`.
    pub shell: bool,
    pub log_output: bool,
    pub user: Option<String>,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            shell: true,
            log_output: true,
            user: None,
        }
    }
}

impl ExecOptions {
    pub fn quiet() -> Self {
        Self {
            log_output: false,
            ..Self::default()
        }
    }
}

/// Exit code and combined stdout/stderr of a device command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i64,
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Common interface to a device under test, whatever hosts it.
#[async_trait]
pub trait DeviceAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Configured device id, if known without asking the device.
    fn device_id(&self) -> Option<&str>;

    fn test_start_time(&self) -> DateTime<Utc>;

    fn set_test_start_time(&mut self, time: DateTime<Utc>);

    fn is_existing_device(&self) -> bool;

    async fn start_time(&self) -> Result<DateTime<Utc>>;

    async fn uptime(&self) -> Result<Duration> {
        let started = self.start_time().await?;
        Ok((Utc::now() - started).to_std().unwrap_or_default())
    }

    async fn execute_command(&self, cmd: &str, options: &ExecOptions) -> Result<CommandOutput>;

    /// Run `cmd` and check its exit code. `None` accepts any exit code.
    async fn assert_command(
        &self,
        cmd: &str,
        expected_exit_code: Option<i64>,
        options: &ExecOptions,
    ) -> Result<String> {
        let result = self.execute_command(cmd, options).await?;
        if let Some(expected) = expected_exit_code.filter(|code| *code != result.exit_code) {
            return Err(HarnessError::UnexpectedExitCode {
                command: command_snippet(cmd),
                expected,
                actual: result.exit_code,
                output: result.output,
            });
        }
        Ok(result.output)
    }

    async fn restart(&self) -> Result<()>;

    async fn disconnect_network(&self) -> Result<()>;

    async fn connect_network(&self) -> Result<()>;

    /// Service journal of the thin-edge components, one entry per line.
    async fn get_logs(&self, since: Option<&str>) -> Result<Vec<String>> {
        let mut cmd = LOG_COMMAND.to_string();
        if let Some(since) = since {
            cmd.push_str(&format!(" --since \"{since}\""));
        }
        let result = self.execute_command(&cmd, &ExecOptions::quiet()).await?;
        if !result.success() {
            warn!(
                "Could not retrieve journalctl logs. cmd={}, exit_code={}",
                cmd, result.exit_code
            );
        }
        Ok(result.output.lines().map(str::to_string).collect())
    }

    /// Device id as configured in thin-edge.
    async fn get_id(&self) -> Result<String> {
        let result = self
            .execute_command("tedge config get device.id", &ExecOptions::quiet())
            .await?;
        if !result.success() {
            return Err(HarnessError::Runtime(format!(
                "Failed to get device id. device: name={}, code={}, output={}",
                self.name(),
                result.exit_code,
                result.output.trim()
            )));
        }
        let id = result.output.trim().to_string();
        info!("Device id: {}", id);
        Ok(id)
    }

    /// Copy host files matching `src` (path or glob) to `dst` on the device.
    /// Returns the number of files copied.
    async fn copy_to(&self, src: &str, dst: &str) -> Result<usize>;

    /// Undo test-time changes such as a disconnected network.
    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }

    /// Destroy the device. Calling it again is a no-op.
    async fn remove(&mut self) -> Result<()>;
}
