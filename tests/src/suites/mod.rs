//! E2E suites, one module per device capability

pub mod fixtures;
pub mod helpers;

mod alarms;
mod child_devices;
mod command;
mod configuration;
mod events;
mod log_plugin;
mod measurements;
mod restart;
mod software;

pub use fixtures::TestSetup;
pub use helpers::{E2EError, E2EResult};
