//! Realtime subscriptions through the `c8y` command line tool.

use std::process::Stdio;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::error::{HarnessError, Result};

/// Parses one JSON document per stdout line of a subscription process.
pub struct JsonReader {
    child: Child,
}

impl JsonReader {
    pub fn spawn(mut command: Command) -> Result<Self> {
        let child = command
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| HarnessError::Runtime(format!("failed to start subscriber: {e}")))?;
        Ok(Self { child })
    }

    /// Read until the process closes stdout. Blank lines are skipped.
    pub async fn read_all<T: DeserializeOwned>(&mut self) -> Result<Vec<T>> {
        let stdout = self
            .child
            .stdout
            .take()
            .ok_or_else(|| HarnessError::Runtime("subscriber output already consumed".into()))?;

        let mut lines = BufReader::new(stdout).lines();
        let mut items = Vec::new();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            items.push(serde_json::from_str(&line)?);
        }
        debug!("Subscriber produced {} item(s)", items.len());
        Ok(items)
    }

    /// Wait for the process to exit and require a zero exit code.
    pub async fn wait(&mut self, timeout: Duration) -> Result<()> {
        let status = tokio::time::timeout(timeout, self.child.wait())
            .await
            .map_err(|_| {
                HarnessError::Runtime(format!("subscriber did not exit within {timeout:?}"))
            })??;
        if !status.success() {
            return Err(HarnessError::UnexpectedExitCode {
                command: "c8y measurements subscribe".into(),
                expected: 0,
                actual: status.code().map(i64::from).unwrap_or(-1),
                output: String::new(),
            });
        }
        Ok(())
    }
}

pub struct Subscriber;

impl Subscriber {
    /// Subscribe to the device's measurements for `duration`.
    pub fn to_measurements(device_id: &str, duration: Duration) -> Result<JsonReader> {
        info!(
            "Subscribing to measurements of {} for {}s",
            device_id,
            duration.as_secs()
        );
        let mut command = Command::new("c8y");
        command.args([
            "measurements",
            "subscribe",
            "--device",
            device_id,
            "--duration",
            &format!("{}s", duration.as_secs()),
        ]);
        JsonReader::spawn(command)
    }
}
