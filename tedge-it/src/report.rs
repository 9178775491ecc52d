//! Per-test device log files and teardown results.

use std::fmt::Display;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::error::{HarnessError, Result};

/// How a test case ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed(String),
}

impl TestOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// `inttest-<id>-<test name>-<serial>[.failed].log`
pub fn log_file_name(test_id: &str, test_name: &str, device_sn: &str, failed: bool) -> String {
    let test_name = test_name.replace('[', "-").replace(']', "");
    let suffix = if failed { ".failed" } else { "" };
    format!("inttest-{test_id}-{test_name}-{device_sn}{suffix}.log")
}

/// Everything written to a device log file.
pub struct DeviceLog<'a> {
    pub test_id: &'a str,
    pub test_name: &'a str,
    pub device_sn: &'a str,
    pub outcome: Option<&'a TestOutcome>,
    /// Cloud-side state of the device, empty when it was not cloud-bound.
    pub diagnostics: &'a [String],
    pub device_logs: &'a [String],
}

impl DeviceLog<'_> {
    pub fn write_to(&self, output_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(output_dir)?;
        let failed = self.outcome.is_some_and(TestOutcome::is_failed);
        let path = output_dir.join(log_file_name(
            self.test_id,
            self.test_name,
            self.device_sn,
            failed,
        ));

        let mut file = fs::File::create(&path)?;
        if let Some(TestOutcome::Failed(reason)) = self.outcome {
            writeln!(file, "--------------------- Test case ---------------------")?;
            writeln!(file, "{reason}")?;
            writeln!(file, "--------------------- Test case end ---------------------")?;
        }
        if !self.diagnostics.is_empty() {
            writeln!(file, "\n--------------------- Cloud diagnostics ---------------------")?;
            file.write_all(self.diagnostics.join("\n").as_bytes())?;
            writeln!(file)?;
        }
        writeln!(file, "\n--------------------- Device logs ---------------------")?;
        file.write_all(self.device_logs.join("\n").as_bytes())?;
        writeln!(file)?;

        info!("Saved device logs to {}", path.display());
        Ok(path)
    }
}

#[derive(Debug)]
pub struct TeardownFailure {
    pub device: String,
    pub step: &'static str,
    pub error: HarnessError,
}

/// Result of tearing down every device of a session.
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub devices: Vec<String>,
    pub log_files: Vec<PathBuf>,
    pub failures: Vec<TeardownFailure>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Record a step, logging (not propagating) its failure.
    pub fn record<T>(&mut self, device: &str, step: &'static str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                error!("Teardown of {} failed at {}: {}", device, step, e);
                self.failures.push(TeardownFailure {
                    device: device.to_string(),
                    step,
                    error: e,
                });
                None
            }
        }
    }
}

impl Display for TeardownReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} device(s) torn down, {} failure(s)",
            self.devices.len(),
            self.failures.len()
        )?;
        for failure in &self.failures {
            write!(f, "\n  {} [{}]: {}", failure.device, failure.step, failure.error)?;
        }
        Ok(())
    }
}
