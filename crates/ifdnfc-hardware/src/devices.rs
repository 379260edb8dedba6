//! Enum wrapper for reader dispatch.
//!
//! The session stores its reader as an [`AnyNfcDevice`] so that new
//! backends can be added behind feature flags without making the session
//! generic or boxing the reader.
//!
//! ```
//! use ifdnfc_hardware::devices::AnyNfcDevice;
//! use ifdnfc_hardware::mock::MockNfcReader;
//! use ifdnfc_hardware::traits::NfcDevice;
//!
//! let (reader, _handle) = MockNfcReader::new("usb:001:002".parse().unwrap());
//! let any = AnyNfcDevice::Mock(reader);
//! assert_eq!(any.connstring().as_str(), "usb:001:002");
//! ```

use ifdnfc_core::{ConnString, Target, Technology};

use crate::mock::MockNfcReader;
use crate::traits::NfcDevice;
use crate::types::{DeviceInfo, Timeout};
use crate::Result;

/// Any supported reader.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyNfcDevice {
    /// Mock reader for development and testing.
    Mock(MockNfcReader),
}

impl NfcDevice for AnyNfcDevice {
    fn info(&self) -> DeviceInfo {
        match self {
            Self::Mock(device) => device.info(),
        }
    }

    fn connstring(&self) -> &ConnString {
        match self {
            Self::Mock(device) => device.connstring(),
        }
    }

    fn initiator_init(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.initiator_init(),
        }
    }

    fn select_passive_target(
        &mut self,
        technology: Technology,
        init_data: Option<&[u8]>,
        blocking: bool,
    ) -> Result<Option<Target>> {
        match self {
            Self::Mock(device) => device.select_passive_target(technology, init_data, blocking),
        }
    }

    fn deselect_target(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.deselect_target(),
        }
    }

    fn target_is_present(&mut self, target: &Target) -> Result<()> {
        match self {
            Self::Mock(device) => device.target_is_present(target),
        }
    }

    fn transceive_bytes(
        &mut self,
        tx: &[u8],
        rx_capacity: usize,
        timeout: Timeout,
    ) -> Result<Vec<u8>> {
        match self {
            Self::Mock(device) => device.transceive_bytes(tx, rx_capacity, timeout),
        }
    }

    fn idle(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.idle(),
        }
    }

    fn set_field(&mut self, enabled: bool) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_field(enabled),
        }
    }

    fn close(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.close(),
        }
    }
}

impl From<MockNfcReader> for AnyNfcDevice {
    fn from(device: MockNfcReader) -> Self {
        Self::Mock(device)
    }
}
