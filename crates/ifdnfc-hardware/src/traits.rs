//! Reader primitive trait.
//!
//! [`NfcDevice`] is the contract between the slot state machine and a
//! physical reader. Every method performs exactly one reader operation and
//! may block for the duration of the transport I/O. Nothing is retried here.

use ifdnfc_core::{ConnString, Target, Technology};

use crate::error::Result;
use crate::types::{DeviceInfo, Timeout};

/// An open contactless reader acting as initiator.
///
/// The trait is synchronous and object-safe. The host invokes one operation
/// at a time, so implementations need no internal locking beyond what their
/// transport requires.
///
/// For dynamic dispatch over concrete readers, use
/// [`AnyNfcDevice`](crate::devices::AnyNfcDevice).
///
/// # Examples
///
/// ```
/// use ifdnfc_core::{Target, Technology};
/// use ifdnfc_hardware::mock::MockBus;
/// use ifdnfc_hardware::traits::NfcDevice;
/// use ifdnfc_hardware::connector::{Backend, Connector};
///
/// let mut bus = MockBus::new();
/// let handle = bus.attach("usb:001:002".parse().unwrap());
/// handle.place_target(Target::type_a(vec![1, 2, 3, 4], vec![0x00]).unwrap());
///
/// let backend = Backend::Mock(bus);
/// let mut reader = backend.open(None).unwrap();
/// reader.initiator_init().unwrap();
/// let target = reader
///     .select_passive_target(Technology::TypeA106, None, false)
///     .unwrap();
/// assert!(target.is_some());
/// ```
pub trait NfcDevice: Send {
    /// Reader metadata.
    fn info(&self) -> DeviceInfo;

    /// Address this reader was opened with.
    fn connstring(&self) -> &ConnString;

    /// Put the reader into initiator mode with the RF field on.
    ///
    /// # Errors
    /// Fails if the reader does not answer or rejects the configuration.
    fn initiator_init(&mut self) -> Result<()>;

    /// Poll for a passive target of the given technology.
    ///
    /// `init_data` restricts the selection to one target (the UID for Type A).
    /// With `blocking` set the reader waits until a target shows up instead of
    /// polling once. `Ok(None)` means no target answered.
    ///
    /// # Errors
    /// Fails on transport errors, not on absence of a target.
    fn select_passive_target(
        &mut self,
        technology: Technology,
        init_data: Option<&[u8]>,
        blocking: bool,
    ) -> Result<Option<Target>>;

    /// Release the selected target.
    fn deselect_target(&mut self) -> Result<()>;

    /// Lightweight liveness query for the selected target.
    ///
    /// # Errors
    /// Returns `HardwareError::TargetLost` when `target` no longer answers.
    fn target_is_present(&mut self, target: &Target) -> Result<()>;

    /// Send `tx` to the selected target and return its response.
    ///
    /// # Errors
    /// Returns `HardwareError::Overflow` if the response is longer than
    /// `rx_capacity`, `HardwareError::TargetLost` if the target vanished.
    fn transceive_bytes(&mut self, tx: &[u8], rx_capacity: usize, timeout: Timeout)
    -> Result<Vec<u8>>;

    /// Switch the reader to low-power idle, RF field off.
    fn idle(&mut self) -> Result<()>;

    /// Turn the RF field on or off without changing the mode.
    fn set_field(&mut self, enabled: bool) -> Result<()>;

    /// Release the reader.
    fn close(&mut self) -> Result<()>;
}
