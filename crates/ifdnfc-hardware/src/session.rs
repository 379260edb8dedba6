//! Device session: the open connection to one physical reader.
//!
//! The session owns the backend and at most one open reader. It puts the
//! reader into initiator mode when opening it, remembers the address that
//! was actually opened, and releases the reader on close or drop. The slot
//! state machine drives the reader only through the primitives exposed
//! here.

use ifdnfc_core::types::hex;
use ifdnfc_core::{ConnString, Target, Technology};
use tracing::{debug, info, trace, warn};

use crate::connector::{Backend, Connector};
use crate::devices::AnyNfcDevice;
use crate::error::{HardwareError, Result};
use crate::traits::NfcDevice;
use crate::types::{DeviceInfo, Timeout};

/// Connection to at most one reader.
///
/// # Examples
///
/// ```
/// use ifdnfc_hardware::connector::Backend;
/// use ifdnfc_hardware::mock::MockBus;
/// use ifdnfc_hardware::session::DeviceSession;
///
/// let mut bus = MockBus::new();
/// let handle = bus.attach("usb:001:002".parse().unwrap());
///
/// let mut session = DeviceSession::new(Backend::Mock(bus));
/// let opened = session.open(None).unwrap();
/// assert_eq!(opened.as_str(), "usb:001:002");
/// assert!(handle.is_initiator());
///
/// session.close();
/// assert!(!handle.is_open());
/// ```
#[derive(Debug)]
pub struct DeviceSession {
    backend: Backend,
    device: Option<AnyNfcDevice>,
}

impl DeviceSession {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            device: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Address of the open reader.
    pub fn connstring(&self) -> Option<&ConnString> {
        self.device.as_ref().map(NfcDevice::connstring)
    }

    pub fn info(&self) -> Option<DeviceInfo> {
        self.device.as_ref().map(NfcDevice::info)
    }

    /// Readers the backend can open.
    pub fn list_devices(&self) -> Result<Vec<ConnString>> {
        self.backend.list_devices()
    }

    /// Open the reader at `connstring`, or the first available one, and
    /// initialize it as initiator.
    ///
    /// Opening the reader that is already open is a no-op, as is opening
    /// "any reader" while one is open. Asking for a different reader closes
    /// the current one first.
    ///
    /// # Errors
    /// Fails if the reader cannot be opened or initialized. The session is
    /// closed afterwards in both cases.
    pub fn open(&mut self, connstring: Option<&ConnString>) -> Result<ConnString> {
        if let Some(current) = self.connstring() {
            if connstring.is_none_or(|wanted| wanted == current) {
                debug!(connstring = %current, "reader already open");
                return Ok(current.clone());
            }
            info!(from = %current, to = ?connstring.map(ConnString::as_str), "switching reader");
            self.close();
        }

        let mut device = self.backend.open(connstring)?;
        if let Err(e) = device.initiator_init() {
            warn!(connstring = %device.connstring(), error = %e, "initiator init failed");
            if let Err(close_err) = device.close() {
                debug!(error = %close_err, "close after failed init");
            }
            return Err(HardwareError::initialization_failed(e.to_string()));
        }

        let opened = device.connstring().clone();
        info!(connstring = %opened, name = %device.info().name, "reader opened");
        self.device = Some(device);
        Ok(opened)
    }

    /// Release the reader. Always leaves the session closed.
    pub fn close(&mut self) {
        if let Some(mut device) = self.device.take() {
            let connstring = device.connstring().clone();
            match device.close() {
                Ok(()) => info!(%connstring, "reader closed"),
                Err(e) => warn!(%connstring, error = %e, "reader close failed"),
            }
        }
    }

    fn device(&mut self) -> Result<&mut AnyNfcDevice> {
        self.device.as_mut().ok_or(HardwareError::NotOpen)
    }

    pub fn initiator_init(&mut self) -> Result<()> {
        self.device()?.initiator_init()
    }

    /// Poll once (or block, if asked) for a target of `technology`.
    pub fn select(
        &mut self,
        technology: Technology,
        init_data: Option<&[u8]>,
        blocking: bool,
    ) -> Result<Option<Target>> {
        let found = self
            .device()?
            .select_passive_target(technology, init_data, blocking)?;
        match &found {
            Some(target) => debug!(%target, "target selected"),
            None => trace!(%technology, "no target"),
        }
        Ok(found)
    }

    pub fn deselect(&mut self) -> Result<()> {
        self.device()?.deselect_target()
    }

    /// Liveness query for `target`.
    pub fn ping(&mut self, target: &Target) -> Result<()> {
        self.device()?.target_is_present(target)
    }

    pub fn transceive(&mut self, tx: &[u8], rx_capacity: usize, timeout: Timeout) -> Result<Vec<u8>> {
        trace!(tx = %hex(tx), %timeout, "transceive");
        let rx = self.device()?.transceive_bytes(tx, rx_capacity, timeout)?;
        trace!(rx = %hex(&rx), "transceive done");
        Ok(rx)
    }

    pub fn idle(&mut self) -> Result<()> {
        self.device()?.idle()
    }

    pub fn set_field(&mut self, enabled: bool) -> Result<()> {
        self.device()?.set_field(enabled)
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.close();
    }
}
