//! Reader enumeration and opening.

use ifdnfc_core::ConnString;
use tracing::debug;

use crate::devices::AnyNfcDevice;
use crate::mock::MockBus;
use crate::traits::NfcDevice;
use crate::Result;

/// Source of readers: lists what is plugged in and opens one.
pub trait Connector {
    type Device: NfcDevice;

    /// Connection strings of the readers currently available.
    fn list_devices(&self) -> Result<Vec<ConnString>>;

    /// Open the reader at `connstring`, or the first available reader.
    fn open(&self, connstring: Option<&ConnString>) -> Result<Self::Device>;
}

/// Any supported reader backend.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Backend {
    /// Simulated readers.
    Mock(MockBus),
}

impl Connector for Backend {
    type Device = AnyNfcDevice;

    fn list_devices(&self) -> Result<Vec<ConnString>> {
        match self {
            Self::Mock(bus) => Ok(bus.list()),
        }
    }

    fn open(&self, connstring: Option<&ConnString>) -> Result<AnyNfcDevice> {
        debug!(connstring = ?connstring.map(ConnString::as_str), "opening reader");
        match self {
            Self::Mock(bus) => bus.open(connstring).map(AnyNfcDevice::Mock),
        }
    }
}

impl From<MockBus> for Backend {
    fn from(bus: MockBus) -> Self {
        Self::Mock(bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_lists_and_opens() {
        let mut bus = MockBus::new();
        bus.attach(ConnString::new("pn533_usb:001:002").unwrap());
        let backend = Backend::from(bus);

        let devices = backend.list_devices().unwrap();
        assert_eq!(devices.len(), 1);
        let device = backend.open(Some(&devices[0])).unwrap();
        assert_eq!(device.connstring(), &devices[0]);
    }
}
