//! Devices under test and how they are provisioned.

pub mod adapter;
pub mod archive;
pub mod docker;
pub mod factory;

pub use adapter::{CommandOutput, DeviceAdapter, ExecOptions};
pub use docker::DockerDeviceAdapter;
pub use factory::{DeviceOptions, DockerDeviceFactory};
