//! Integration-test harness for thin-edge.io devices running in containers
//! and connected to a Cumulocity tenant.

pub mod assertion;
pub mod cloud;
pub mod config;
pub mod device;
pub mod dut;
pub mod error;
pub mod keywords;
pub mod report;
pub mod session;
pub mod util;

pub use tedge_it_shared as shared;

pub use assertion::{CountRange, RetryConfig};
pub use cloud::DeviceManagement;
pub use config::HarnessConfig;
pub use device::{DeviceAdapter, DockerDeviceAdapter, DockerDeviceFactory};
pub use dut::Dut;
pub use error::{HarnessError, Result};
pub use keywords::{KeywordOutput, KeywordRegistry};
pub use report::{TeardownReport, TestOutcome};
pub use session::DeviceSession;

// === CLI entrypoint ===
pub mod cli;

/// Entrypoint used by `main.rs` to run the task runner.
pub async fn run_cli() -> anyhow::Result<()> {
    cli::cli().await
}
