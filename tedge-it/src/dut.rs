use tedge_it_shared::inventory::ManagedObject;

use crate::cloud::DeviceManagement;
use crate::device::DeviceAdapter;
use crate::error::{HarnessError, Result};

/// Device under test: the device itself and, once registered, its cloud view.
pub struct Dut {
    pub device: Box<dyn DeviceAdapter>,
    pub cloud: Option<DeviceManagement>,
    /// Managed object resolved when the cloud context was bound.
    pub managed_object: Option<ManagedObject>,
    /// Lower-case thumbprint of the device certificate.
    pub cert_fingerprint: Option<String>,
}

impl Dut {
    pub fn new(device: Box<dyn DeviceAdapter>) -> Self {
        Self {
            device,
            cloud: None,
            managed_object: None,
            cert_fingerprint: None,
        }
    }

    pub fn name(&self) -> &str {
        self.device.name()
    }

    pub fn cloud(&self) -> Result<&DeviceManagement> {
        self.cloud.as_ref().ok_or_else(|| {
            HarnessError::Config(format!("device {} is not bound to the cloud", self.name()))
        })
    }

    pub fn cloud_mut(&mut self) -> Result<&mut DeviceManagement> {
        let name = self.device.name().to_string();
        self.cloud
            .as_mut()
            .ok_or_else(|| HarnessError::Config(format!("device {name} is not bound to the cloud")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::fake::FakeDevice;

    #[test]
    fn test_cloudless_dut() {
        let mut dut = Dut::new(Box::new(FakeDevice::new("STC-1")));
        assert_eq!(dut.name(), "STC-1");
        assert!(matches!(dut.cloud(), Err(HarnessError::Config(_))));
        assert!(dut.cloud_mut().is_err());
    }
}
