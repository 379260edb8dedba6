//! Host-facing entry points.
//!
//! [`IfdHandler`] is the single context object the host drives. Each method
//! corresponds to one call of the IFD handler interface, performs at most the
//! slot transition that call describes, and returns. Capacities are the
//! sizes of the host's output buffers: a result that does not fit fails
//! with `CommunicationError` and nothing is written.
//!
//! # Activation
//!
//! Channel creation only records which reader the host asked for. The reader
//! is opened when the activation utility sends `SET_ACTIVE` over the control
//! channel, or on first use when [`HandlerConfig::auto_activate`] is set.
//!
//! # Examples
//!
//! ```
//! use ifdnfc_core::Target;
//! use ifdnfc_core::constants::{IFD_POWER_UP, IFDNFC_CTRL_ACTIVE, IFDNFC_IS_ACTIVE};
//! use ifdnfc_driver::{HandlerConfig, IfdHandler};
//! use ifdnfc_hardware::{Backend, mock::MockBus};
//! use ifdnfc_protocol::ControlRequest;
//!
//! let mut bus = MockBus::new();
//! let reader = bus.attach("usb:001:002".parse().unwrap());
//! reader.place_target(Target::type_a(vec![1, 2, 3, 4], vec![0x00]).unwrap());
//!
//! let mut handler = IfdHandler::new(Backend::Mock(bus), HandlerConfig::default());
//! handler.create_channel(0);
//!
//! let request = ControlRequest::SetActive(None).to_bytes();
//! let response = handler.control(IFDNFC_CTRL_ACTIVE, &request, 64).unwrap();
//! assert_eq!(response[0], IFDNFC_IS_ACTIVE);
//!
//! let atr = handler.power_icc(IFD_POWER_UP, 33).unwrap();
//! assert_eq!(atr, vec![0x3B, 0x80, 0x80, 0x01, 0x01]);
//! ```

use ifdnfc_core::constants::*;
use ifdnfc_core::{ConnString, DeviceName, Error, ResponseCode, Result, hex};
use ifdnfc_hardware::Backend;
use ifdnfc_protocol::{ControlRequest, ControlResponse};
use ifdnfc_slot::{SlotMachine, SlotState};
use tracing::{debug, info, warn};

use crate::config::HandlerConfig;
use crate::logging;

/// Response of [`IfdHandler::transmit_to_icc`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmission {
    /// Bytes returned by the target.
    pub data: Vec<u8>,

    /// Protocol the exchange ran under, always `T=1`.
    pub protocol: u32,
}

/// Map an entry-point outcome onto the host response code.
pub fn response_code<T>(result: &Result<T>) -> ResponseCode {
    match result {
        Ok(_) => ResponseCode::Success,
        Err(e) => e.response_code(),
    }
}

/// The virtual reader as seen by the host.
#[derive(Debug)]
pub struct IfdHandler {
    config: HandlerConfig,
    machine: SlotMachine,

    /// Device name from the last channel creation.
    device_name: Option<DeviceName>,

    /// Reader designated by the device name, if it names one.
    bound: Option<ConnString>,
}

impl IfdHandler {
    /// Create the handler context.
    ///
    /// Installs the log subscriber first when the configuration asks for it.
    pub fn new(backend: Backend, config: HandlerConfig) -> Self {
        if config.init_logging && !logging::init(&config.log_filter) {
            debug!("log subscriber already installed");
        }

        Self {
            machine: SlotMachine::new(backend, config.slot.clone()),
            config,
            device_name: None,
            bound: None,
        }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn machine(&self) -> &SlotMachine {
        &self.machine
    }

    pub fn state(&self) -> SlotState {
        self.machine.state()
    }

    /// Whether a device session is open.
    pub fn is_active(&self) -> bool {
        self.machine.is_open()
    }

    pub fn device_name(&self) -> Option<&DeviceName> {
        self.device_name.as_ref()
    }

    /// Reader address recorded at channel creation.
    pub fn bound(&self) -> Option<&ConnString> {
        self.bound.as_ref()
    }

    /// Bind the handler to a host device name.
    ///
    /// Nothing is opened. A name that designates a USB reader binds its
    /// address for later activation; any other name leaves the handler
    /// unbound. Always succeeds.
    pub fn create_channel_by_name(&mut self, name: &str) {
        if self.machine.is_open() {
            info!("channel recreated, closing open session");
            self.machine.close();
        }

        match DeviceName::parse(name) {
            Ok(device_name) => {
                self.bound = device_name.connstring();
                self.device_name = Some(device_name);
            }
            Err(e) => {
                warn!(name, error = %e, "unusable device name, no reader bound");
                self.bound = None;
                self.device_name = None;
            }
        }

        info!(
            name,
            bound = self.bound.as_ref().map(ConnString::as_str),
            "channel created, readers are opened on demand"
        );
    }

    /// Bind the handler to a numbered channel, `/dev/pcsc/<channel>`.
    pub fn create_channel(&mut self, channel: u32) {
        self.create_channel_by_name(&format!("{PCSC_DEVICE_PREFIX}{channel}"));
    }

    /// Release the target and the reader.
    pub fn close_channel(&mut self) {
        info!("closing channel");
        self.machine.close();
    }

    /// Read a capability.
    ///
    /// # Errors
    /// - `UnknownTag` for tags this reader does not report
    /// - `CommunicationError` when the ATR is requested without an active
    ///   reader, or the value does not fit in `capacity`
    /// - `CardAbsent` when the ATR is requested and no target is found
    pub fn get_capabilities(&mut self, tag: u32, capacity: usize) -> Result<Vec<u8>> {
        debug!(tag = format_args!("0x{tag:04X}"), capacity, "get capabilities");

        let result = match tag {
            TAG_IFD_ATR | SCARD_ATTR_ATR_STRING => self
                .ensure_active()
                .and_then(|()| self.machine.atr())
                .and_then(|atr| fit(atr.as_bytes().to_vec(), capacity)),
            TAG_IFD_SLOTS_NUMBER | TAG_IFD_SIMULTANEOUS_ACCESS => fit(vec![1], capacity),
            TAG_IFD_THREAD_SAFE | TAG_IFD_SLOT_THREAD_SAFE => fit(vec![0], capacity),
            _ => Err(Error::UnknownTag(tag)),
        };

        log_outcome("get capabilities", &result);
        result
    }

    /// Capabilities are read-only.
    ///
    /// # Errors
    /// Always `ReadOnly`.
    pub fn set_capabilities(&mut self, tag: u32, value: &[u8]) -> Result<()> {
        warn!(tag = format_args!("0x{tag:04X}"), value = %hex(value), "rejected capability write");
        Err(Error::ReadOnly(tag))
    }

    /// Accept the protocol selection if it is `T=1`.
    ///
    /// # Errors
    /// `ProtocolNotSupported` for anything else.
    pub fn set_protocol_parameters(&mut self, protocol: u32) -> Result<()> {
        if protocol == SCARD_PROTOCOL_T1 {
            debug!("protocol T=1 selected");
            Ok(())
        } else {
            warn!(protocol, "protocol not supported");
            Err(Error::ProtocolNotSupported(protocol))
        }
    }

    /// Power the card up or down, or reset it.
    ///
    /// Returns the ATR after power-up and reset, nothing after power-down.
    ///
    /// # Errors
    /// - `ActionNotSupported` for unknown actions
    /// - `CommunicationError` without an active reader, when a known target
    ///   cannot be reselected, or when the ATR does not fit in `capacity`
    /// - `PowerActionError` when the field cannot be switched or a reset
    ///   fails
    /// - `CardAbsent` when powering up finds no target
    pub fn power_icc(&mut self, action: u32, capacity: usize) -> Result<Vec<u8>> {
        info!(action = power_action_name(action), "power card");

        let result = match action {
            IFD_POWER_DOWN => self
                .ensure_active()
                .and_then(|()| self.machine.power_down())
                .map(|()| Vec::new()),
            IFD_POWER_UP => self
                .ensure_active()
                .and_then(|()| self.machine.power_up())
                .and_then(|atr| fit(atr.as_bytes().to_vec(), capacity)),
            IFD_RESET => self
                .ensure_active()
                .and_then(|()| self.machine.reset())
                .and_then(|atr| fit(atr.as_bytes().to_vec(), capacity)),
            _ => Err(Error::ActionNotSupported(format!("power action {action}"))),
        };

        log_outcome("power card", &result);
        result
    }

    /// Relay an APDU to the target.
    ///
    /// # Errors
    /// - `CardAbsent` without an active reader or target
    /// - `CommunicationError` when the target is unpowered, the response
    ///   exceeds `rx_capacity`, or the transport fails
    pub fn transmit_to_icc(&mut self, tx: &[u8], rx_capacity: usize) -> Result<Transmission> {
        if !self.machine.is_open() {
            debug!("transmit without active reader");
            return Err(Error::CardAbsent);
        }

        info!(tx = %hex(tx), "sending to target");
        let result = self.machine.transmit(tx, rx_capacity).map(|data| {
            info!(rx = %hex(&data), "received from target");
            Transmission {
                data,
                protocol: SCARD_PROTOCOL_T1,
            }
        });

        log_outcome("transmit", &result);
        result
    }

    /// Check for a card in the slot.
    ///
    /// # Errors
    /// `CardAbsent` when the handler is inactive or no target answers.
    pub fn icc_presence(&mut self) -> Result<()> {
        if self.ensure_active().is_err() {
            return Err(Error::CardAbsent);
        }
        self.machine.presence_check()
    }

    /// Handle an out-of-band control request.
    ///
    /// Only the activation channel is supported. The response is encoded per
    /// the control-channel wire format.
    ///
    /// # Errors
    /// - `ActionNotSupported` for other control codes
    /// - `CommunicationError` for malformed requests, a reader that cannot
    ///   be opened, or a response that does not fit in `rx_capacity`
    pub fn control(&mut self, code: u32, tx: &[u8], rx_capacity: usize) -> Result<Vec<u8>> {
        if code != IFDNFC_CTRL_ACTIVE && code != IFDNFC_CTRL_ACTIVE_WRAPPED {
            warn!(code = format_args!("0x{code:08X}"), "control code not supported");
            return Err(Error::ActionNotSupported(format!("control code 0x{code:08X}")));
        }
        if rx_capacity < 1 {
            return Err(Error::BufferTooSmall {
                needed: 1,
                capacity: rx_capacity,
            });
        }

        let result = ControlRequest::decode(tx)
            .and_then(|request| self.activation(request))
            .and_then(|response| fit(response.to_bytes(), rx_capacity));

        log_outcome("control", &result);
        result
    }

    fn activation(&mut self, request: ControlRequest) -> Result<ControlResponse> {
        match request {
            ControlRequest::SetActive(connstring) => {
                let opened = self.machine.open(connstring.as_ref())?;
                info!(connstring = %opened, "activated");
            }
            ControlRequest::SetInactive => {
                self.machine.close();
                info!("deactivated");
            }
            ControlRequest::GetStatus => {}
        }

        Ok(match self.machine.connstring() {
            Some(connstring) => ControlResponse::Active(connstring.clone()),
            None => ControlResponse::Inactive,
        })
    }

    /// Make sure a reader is open, opening the bound one if allowed.
    fn ensure_active(&mut self) -> Result<()> {
        if self.machine.is_open() {
            return Ok(());
        }
        if !self.config.auto_activate {
            return Err(Error::communication("handler is not active"));
        }

        let opened = self.machine.open(self.bound.as_ref())?;
        info!(connstring = %opened, "activated on demand");
        Ok(())
    }
}

/// Check that `bytes` fits in a host buffer of `capacity` bytes.
fn fit(bytes: Vec<u8>, capacity: usize) -> Result<Vec<u8>> {
    if bytes.len() > capacity {
        return Err(Error::BufferTooSmall {
            needed: bytes.len(),
            capacity,
        });
    }
    Ok(bytes)
}

fn power_action_name(action: u32) -> &'static str {
    match action {
        IFD_POWER_UP => "power up",
        IFD_POWER_DOWN => "power down",
        IFD_RESET => "reset",
        _ => "unknown",
    }
}

fn log_outcome<T>(operation: &str, result: &Result<T>) {
    match result {
        Ok(_) => debug!(operation, "succeeded"),
        Err(e) => warn!(operation, code = response_code(result).as_u32(), error = %e, "failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifdnfc_hardware::mock::{MockBus, MockNfcHandle};

    fn handler() -> (IfdHandler, MockNfcHandle) {
        let mut bus = MockBus::new();
        let reader = bus.attach(ConnString::new("usb:002:005").unwrap());
        (
            IfdHandler::new(Backend::Mock(bus), HandlerConfig::default()),
            reader,
        )
    }

    #[test]
    fn test_fit() {
        assert_eq!(fit(vec![1, 2], 2).unwrap(), vec![1, 2]);
        assert!(matches!(
            fit(vec![1, 2], 1),
            Err(Error::BufferTooSmall { needed: 2, capacity: 1 })
        ));
    }

    #[test]
    fn test_response_code_helper() {
        assert_eq!(response_code(&Ok::<_, Error>(())), ResponseCode::Success);
        assert_eq!(
            response_code(&Err::<(), _>(Error::CardAbsent)).as_u32(),
            IFD_ICC_NOT_PRESENT
        );
    }

    #[test]
    fn test_create_channel_binds_usb_reader() {
        let (mut handler, reader) = handler();
        handler.create_channel_by_name("/dev/bus/usb/002/005");

        assert_eq!(handler.bound().map(ConnString::as_str), Some("usb:002:005"));
        assert!(!handler.is_active());
        assert!(!reader.is_open());
    }

    #[test]
    fn test_create_channel_by_number() {
        let (mut handler, _) = handler();
        handler.create_channel(3);

        assert_eq!(
            handler.device_name().map(DeviceName::as_str),
            Some("/dev/pcsc/3")
        );
        assert_eq!(handler.bound(), None);
    }

    #[test]
    fn test_create_channel_ignores_bad_name() {
        let (mut handler, _) = handler();
        handler.create_channel_by_name("/dev/bus/usb/0x2/5");
        assert_eq!(handler.bound(), None);
        assert_eq!(handler.device_name(), None);
    }

    #[test]
    fn test_inactive_handler() {
        let (mut handler, _) = handler();
        handler.create_channel(0);

        assert!(matches!(
            handler.get_capabilities(TAG_IFD_ATR, 33),
            Err(Error::Communication(_))
        ));
        assert!(matches!(
            handler.power_icc(IFD_POWER_UP, 33),
            Err(Error::Communication(_))
        ));
        assert!(matches!(handler.icc_presence(), Err(Error::CardAbsent)));
        assert!(matches!(
            handler.transmit_to_icc(&[0x00], 16),
            Err(Error::CardAbsent)
        ));
    }
}
