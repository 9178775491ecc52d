//! Devices created during a test run and the keywords that act on them.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tedge_it_shared::inventory::{DEFAULT_IDENTITY_TYPE, ManagedObject};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::assertion::CountRange;
use crate::cloud::DeviceManagement;
use crate::config::HarnessConfig;
use crate::device::factory::DEFAULT_TEST_SUITE;
use crate::device::{DeviceAdapter, DeviceOptions, DockerDeviceFactory, ExecOptions};
use crate::dut::Dut;
use crate::error::{HarnessError, Result};
use crate::report::{DeviceLog, TeardownReport, TestOutcome};

const FINGERPRINT_COMMAND: &str =
    "tedge cert show | grep '^Thumbprint:' | cut -d' ' -f2 | tr A-Z a-z";
const READY_DELAY: Duration = Duration::from_secs(2);
const INSTALL_GH_COMMAND: &str = r#"type -p curl >/dev/null || sudo apt install curl -y
curl -fsSL https://cli.github.com/packages/githubcli-archive-keyring.gpg | sudo dd of=/usr/share/keyrings/githubcli-archive-keyring.gpg \
&& sudo chmod go+r /usr/share/keyrings/githubcli-archive-keyring.gpg \
&& echo "deb [arch=$(dpkg --print-architecture) signed-by=/usr/share/keyrings/githubcli-archive-keyring.gpg] https://cli.github.com/packages stable main" | sudo tee /etc/apt/sources.list.d/github-cli.list > /dev/null \
&& sudo apt update \
&& sudo apt install gh -y"#;
const AGENT_LOGS_COMMAND: &str = "tail -n +1 /var/log/tedge/agent/* 2>/dev/null || true";

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<invalid json: {e}>"))
}

/// Managed object, operations since the test started and agent log files
/// of a cloud-bound device. Failures are logged, never returned.
async fn cloud_diagnostics(dut: &Dut) -> Vec<String> {
    let mut lines = Vec::new();
    let (Some(cloud), Some(mo)) = (&dut.cloud, &dut.managed_object) else {
        return lines;
    };

    match cloud.inventory().get(&mo.id).await {
        Ok(mo) => {
            let text = pretty(&mo);
            info!("Managed Object\n{}", text);
            lines.push("Managed Object".to_string());
            lines.extend(text.lines().map(str::to_string));
        }
        Err(e) => warn!("Failed to get device managed object. {}", e),
    }

    match cloud.operations().list(None, None).await {
        Ok(operations) if operations.is_empty() => {
            info!("No operations found");
            lines.push("No operations found".to_string());
        }
        Ok(operations) => {
            for (i, operation) in operations.iter().enumerate() {
                let header = format!("Operation {}: (status={})", i + 1, operation.status.as_str());
                let text = pretty(operation);
                // only unfinished operations are warnings, FAILED may be expected
                if operation.status.is_done() {
                    info!("{}\n{}", header, text);
                } else {
                    warn!("{}\n{}", header, text);
                }
                lines.push(header);
                lines.extend(text.lines().map(str::to_string));
            }
        }
        Err(e) => warn!("Failed to list operations. {}", e),
    }

    match dut
        .device
        .execute_command(AGENT_LOGS_COMMAND, &ExecOptions::quiet())
        .await
    {
        Ok(result) => {
            lines.push("tedge agent logs: /var/log/tedge/agent/*".to_string());
            lines.extend(result.output.lines().map(str::to_string));
        }
        Err(e) => warn!("Failed to read tedge agent logs. {}", e),
    }
    lines
}

/// Owns every device of a run. Built explicitly and passed to tests.
pub struct DeviceSession {
    config: HarnessConfig,
    factory: DockerDeviceFactory,
    cloud: Option<DeviceManagement>,
    devices: BTreeMap<String, Dut>,
    current: Option<String>,
    test_name: Option<String>,
    test_start_time: DateTime<Utc>,
    outcome: Option<TestOutcome>,
}

impl DeviceSession {
    pub fn new(config: HarnessConfig) -> Result<Self> {
        let cloud = match &config.cloud {
            Some(cloud) => Some(DeviceManagement::from_config(cloud, config.retry_config())?),
            None => None,
        };
        Ok(Self::with_cloud(config, cloud))
    }

    pub fn with_cloud(config: HarnessConfig, cloud: Option<DeviceManagement>) -> Self {
        let factory = DockerDeviceFactory::new(config.network.clone());
        Self {
            config,
            factory,
            cloud,
            devices: BTreeMap::new(),
            current: None,
            test_name: None,
            test_start_time: Utc::now(),
            outcome: None,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn test_start_time(&self) -> DateTime<Utc> {
        self.test_start_time
    }

    pub fn device_names(&self) -> Vec<&str> {
        self.devices.keys().map(String::as_str).collect()
    }

    /// Random device name; the prefix defaults to the `PREFIX` test variable.
    pub fn random_name(&self, prefix: Option<&str>) -> String {
        let prefix = prefix.unwrap_or(&self.config.variables.prefix);
        self.factory.generate_name(prefix)
    }

    pub fn start_test(&mut self, name: &str) {
        let now = Utc::now();
        info!("Starting test {}", name);
        self.test_name = Some(name.to_string());
        self.test_start_time = now;
        self.outcome = None;
        for dut in self.devices.values_mut() {
            dut.device.set_test_start_time(now);
            if let Some(cloud) = dut.cloud.as_mut() {
                cloud.set_test_start_time(now);
            }
        }
    }

    pub fn end_test(&mut self, outcome: TestOutcome) {
        info!("Detected end of test");
        if let TestOutcome::Failed(reason) = &outcome {
            info!(
                "Test '{}' failed: {}",
                self.test_name.as_deref().unwrap_or_default(),
                reason
            );
        }
        self.outcome = Some(outcome);
    }

    pub async fn end_suite(&mut self) -> TeardownReport {
        info!("Suite ending");
        self.teardown().await
    }

    /// Make an existing adapter part of the session and the current device.
    pub fn register(&mut self, mut device: Box<dyn DeviceAdapter>) -> &mut Dut {
        device.set_test_start_time(self.test_start_time);
        let name = device.name().to_string();
        self.current = Some(name.clone());
        self.devices.entry(name).or_insert_with(|| Dut::new(device))
    }

    /// Create, bootstrap and register a new container device.
    ///
    /// With a cloud configured and bootstrapping enabled, the device is also
    /// bound to its managed object. Returns the device serial.
    pub async fn setup_device(&mut self, skip_bootstrap: bool) -> Result<String> {
        let name = self.random_name(None);
        let mut env = BTreeMap::new();
        if let Some(cloud) = &self.config.cloud {
            env.insert("C8Y_BASEURL".to_string(), cloud.base_url.clone());
            env.insert("C8Y_TENANT".to_string(), cloud.tenant.clone());
            env.insert("C8Y_USER".to_string(), cloud.user.clone());
            env.insert("C8Y_PASSWORD".to_string(), cloud.password.clone());
        }
        let options = DeviceOptions {
            env_file: self.config.env_file.clone(),
            test_suite: DEFAULT_TEST_SUITE.to_string(),
            env,
        };
        let device = self
            .factory
            .create_device(&name, &self.config.image, &options)
            .await?;
        self.register(Box::new(device));

        if !skip_bootstrap {
            let script = self.config.bootstrap_script.clone();
            self.current()?
                .device
                .assert_command(&script, Some(0), &ExecOptions::default())
                .await?;
            if self.cloud.is_some() {
                self.bind_cloud(None).await?;
            }
        }
        Ok(name)
    }

    /// Resolve the current device's managed object and bind a cloud context to it.
    ///
    /// `external_id` defaults to the device name.
    pub async fn bind_cloud(&mut self, external_id: Option<&str>) -> Result<ManagedObject> {
        let mut ctx = self
            .cloud
            .clone()
            .ok_or_else(|| HarnessError::Config("C8Y_BASEURL is not set".into()))?;
        ctx.set_test_start_time(self.test_start_time);

        let dut = self.current_mut()?;
        let serial = external_id.unwrap_or(dut.name()).to_string();
        let mo = ctx
            .identity()
            .assert_exists(&serial, DEFAULT_IDENTITY_TYPE)
            .await?;
        ctx.set_device_id(mo.id.clone());

        info!("{}", "-".repeat(60));
        info!("DEVICE SERIAL  : {}", serial);
        info!("DEVICE ID      : {}", mo.id);
        info!("DEVICE URL     : {}", ctx.device_url(&mo.id));
        info!("{}", "-".repeat(60));

        if dut.cert_fingerprint.is_none() {
            let fingerprint = dut
                .device
                .assert_command(FINGERPRINT_COMMAND, None, &ExecOptions::quiet())
                .await?;
            let fingerprint = fingerprint.trim();
            if !fingerprint.is_empty() {
                dut.cert_fingerprint = Some(fingerprint.to_string());
            }
        }

        dut.cloud = Some(ctx);
        dut.managed_object = Some(mo.clone());
        Ok(mo)
    }

    pub fn current(&self) -> Result<&Dut> {
        let name = self
            .current
            .as_deref()
            .ok_or_else(|| HarnessError::DeviceNotFound("no device has been set up".into()))?;
        self.get(name)
    }

    pub fn current_mut(&mut self) -> Result<&mut Dut> {
        let name = self
            .current
            .clone()
            .ok_or_else(|| HarnessError::DeviceNotFound("no device has been set up".into()))?;
        self.devices
            .get_mut(&name)
            .ok_or(HarnessError::DeviceNotFound(name))
    }

    pub fn get(&self, name: &str) -> Result<&Dut> {
        self.devices
            .get(name)
            .ok_or_else(|| HarnessError::DeviceNotFound(name.to_string()))
    }

    pub fn set_current(&mut self, name: &str) -> Result<()> {
        self.get(name)?;
        self.current = Some(name.to_string());
        Ok(())
    }

    /// Cloud context of the current device.
    pub fn cloud(&self) -> Result<&DeviceManagement> {
        self.current()?.cloud()
    }

    /// Change the polling timeout of every cloud context.
    pub fn set_api_timeout(&mut self, timeout: Duration) {
        if let Some(cloud) = self.cloud.as_mut() {
            let interval = cloud.retry_config().interval;
            cloud.configure_retries(timeout, interval);
        }
        for dut in self.devices.values_mut() {
            if let Some(cloud) = dut.cloud.as_mut() {
                let interval = cloud.retry_config().interval;
                cloud.configure_retries(timeout, interval);
            }
        }
    }

    pub async fn wait_for_ready(&self) {
        info!("Waiting for device to be ready");
        sleep(READY_DELAY).await;
    }

    //
    // Commands and files
    //

    async fn assert_on_current(&self, cmd: &str) -> Result<String> {
        self.current()?
            .device
            .assert_command(cmd, Some(0), &ExecOptions::default())
            .await
    }

    pub async fn execute_command(&self, cmd: &str, exp_exit_code: Option<i64>) -> Result<String> {
        self.execute_command_with(cmd, exp_exit_code, true).await
    }

    /// Like `execute_command`, with `log_output = false` keeping the output out of the log.
    pub async fn execute_command_with(
        &self,
        cmd: &str,
        exp_exit_code: Option<i64>,
        log_output: bool,
    ) -> Result<String> {
        let options = ExecOptions {
            log_output,
            ..ExecOptions::default()
        };
        self.current()?
            .device
            .assert_command(cmd, exp_exit_code, &options)
            .await
    }

    /// Install the GitHub CLI, then download the thin-edge.io debian packages
    /// built by each workflow run.
    pub async fn download_from_github(&self, run_ids: &[&str], arch: &str) -> Result<()> {
        self.execute_command(INSTALL_GH_COMMAND, Some(0)).await?;
        for run_id in run_ids {
            self.execute_command(
                &format!(
                    "gh run download {run_id} -n debian-packages-{arch}-unknown-linux-gnu -R thin-edge/thin-edge.io"
                ),
                Some(0),
            )
            .await?;
        }
        Ok(())
    }

    pub async fn transfer_to_device(&self, src: &str, dst: &str) -> Result<usize> {
        self.current()?.device.copy_to(src, dst).await
    }

    /// Device logs of `name`, or of the current device.
    ///
    /// Cloud-bound devices also report their managed object, the operations
    /// created since the test started and the tedge agent log files.
    pub async fn get_logs(&self, name: Option<&str>) -> Result<Vec<String>> {
        let dut = match name {
            Some(name) => self.get(name)?,
            None => self.current()?,
        };
        let mut lines = cloud_diagnostics(dut).await;
        lines.extend(dut.device.get_logs(None).await?);
        Ok(lines)
    }

    //
    // APT
    //

    pub async fn apt_update(&self) -> Result<String> {
        self.assert_on_current("apt-get update").await
    }

    pub async fn apt_install(&self, packages: &[&str]) -> Result<String> {
        self.assert_on_current(&format!("apt-get -y install {}", packages.join(" ")))
            .await
    }

    pub async fn apt_remove(&self, packages: &[&str]) -> Result<String> {
        self.assert_on_current(&format!("apt-get -y remove {}", packages.join(" ")))
            .await
    }

    pub async fn apt_purge(&self, packages: &[&str]) -> Result<String> {
        self.assert_on_current(&format!("apt-get -y purge {}", packages.join(" ")))
            .await
    }

    //
    // Files and directories
    //

    pub async fn assert_directory_empty(&self, path: &str) -> Result<()> {
        self.assert_on_current(&format!(r#"[ -d '{path}' ] && [ -z "$(ls -A '{path}')" ]"#))
            .await
            .map(|_| ())
    }

    pub async fn assert_directory_not_empty(&self, path: &str) -> Result<()> {
        self.assert_on_current(&format!(r#"[ -d '{path}' ] && [ -n "$(ls -A '{path}')" ]"#))
            .await
            .map(|_| ())
    }

    pub async fn assert_directory_exists(&self, path: &str) -> Result<()> {
        self.assert_on_current(&format!("test -d '{path}'"))
            .await
            .map(|_| ())
    }

    pub async fn assert_directory_not_exists(&self, path: &str) -> Result<()> {
        self.assert_on_current(&format!("! test -d '{path}'"))
            .await
            .map(|_| ())
    }

    pub async fn assert_file_exists(&self, path: &str) -> Result<()> {
        self.assert_on_current(&format!("test -f '{path}'"))
            .await
            .map(|_| ())
    }

    pub async fn assert_file_not_exists(&self, path: &str) -> Result<()> {
        self.assert_on_current(&format!("! test -f '{path}'"))
            .await
            .map(|_| ())
    }

    //
    // Services
    //

    pub async fn control_service(&self, action: &str, name: &str) -> Result<()> {
        self.assert_on_current(&format!("systemctl {action} {name}"))
            .await
            .map(|_| ())
    }

    pub async fn start_service(&self, name: &str) -> Result<()> {
        self.control_service("start", name).await
    }

    pub async fn stop_service(&self, name: &str) -> Result<()> {
        self.control_service("stop", name).await
    }

    pub async fn restart_service(&self, name: &str) -> Result<()> {
        self.control_service("restart", name).await
    }

    pub async fn reload_services_manager(&self) -> Result<()> {
        self.assert_on_current("systemctl daemon-reload")
            .await
            .map(|_| ())
    }

    //
    // Processes
    //

    async fn count_processes(&self, pattern: &str) -> Result<usize> {
        let output = self
            .current()?
            .device
            .assert_command(
                &format!("pgrep --count -fa '{pattern}' || true"),
                None,
                &ExecOptions::quiet(),
            )
            .await?;
        output.trim().parse().map_err(|_| {
            HarnessError::Assertion(format!("unexpected pgrep output: {}", output.trim()))
        })
    }

    pub async fn assert_process_exists(&self, pattern: &str) -> Result<()> {
        self.assert_on_current(&format!("pgrep -fa '{pattern}'"))
            .await
            .map(|_| ())
    }

    pub async fn assert_process_not_exists(&self, pattern: &str) -> Result<()> {
        let count = self.count_processes(pattern).await?;
        if count != 0 {
            return Err(HarnessError::Assertion(format!(
                "No processes should have matched. got {count}"
            )));
        }
        Ok(())
    }

    /// Number of processes matching `pattern`, checked against `[min, max]`.
    pub async fn assert_process_count(
        &self,
        pattern: &str,
        min: Option<usize>,
        max: Option<usize>,
    ) -> Result<usize> {
        let count = self.count_processes(pattern).await?;
        let range = CountRange::from_bounds(min, max);
        if !range.contains(count) {
            return Err(HarnessError::Assertion(format!(
                "Expected process count for '{pattern}' to be within {range}, got {count}"
            )));
        }
        Ok(count)
    }

    //
    // Teardown
    //

    /// Save logs and destroy every device, cloud objects included.
    ///
    /// Each step is attempted even if an earlier one failed. Calling this
    /// again with no new devices does nothing.
    pub async fn teardown(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();
        let devices = std::mem::take(&mut self.devices);
        self.current = None;
        let test_name = self.test_name.clone().unwrap_or_else(|| "suite".to_string());

        for (name, mut dut) in devices {
            info!("Stopping device: {}", name);
            report.devices.push(name.clone());

            let diagnostics = cloud_diagnostics(&dut).await;
            let logs = report
                .record(&name, "collect logs", dut.device.get_logs(None).await)
                .unwrap_or_default();
            let log = DeviceLog {
                test_id: &self.config.test_id,
                test_name: &test_name,
                device_sn: &name,
                outcome: self.outcome.as_ref(),
                diagnostics: &diagnostics,
                device_logs: &logs,
            };
            if let Some(path) = report.record(
                &name,
                "write log file",
                log.write_to(&self.config.output_dir),
            ) {
                report.log_files.push(path);
            }

            report.record(&name, "cleanup", dut.device.cleanup().await);

            if dut.device.is_existing_device() {
                warn!("Keeping existing device {}", name);
                continue;
            }

            if let Some(cloud) = &dut.cloud {
                if let Some(fingerprint) = &dut.cert_fingerprint {
                    report.record(
                        &name,
                        "delete certificate",
                        cloud.trusted_certificates().delete_certificate(fingerprint).await,
                    );
                }
                if let Some(mo) = &dut.managed_object {
                    report.record(
                        &name,
                        "delete device and user",
                        cloud.inventory().delete_device_and_user(mo).await,
                    );
                }
            }

            report.record(&name, "remove", dut.device.remove().await);
        }

        if !report.is_clean() {
            warn!("{}", report);
        }
        report
    }
}
