//! Mock NFC reader for testing and development.
//!
//! A [`MockNfcReader`] and its [`MockNfcHandle`] share one reader state. The
//! reader side implements [`NfcDevice`]; the handle side lets a test place
//! and remove targets, inject failures, script target responses, and inspect
//! what the reader was asked to do.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ifdnfc_core::{ConnString, Target, Technology};

use crate::error::{HardwareError, Result};
use crate::traits::NfcDevice;
use crate::types::{DeviceInfo, Timeout};

/// Default reader name.
pub const MOCK_READER_NAME: &str = "Mock NFC Reader";

/// Status word returned by targets without a scripted responder.
pub const DEFAULT_RESPONSE: [u8; 2] = [0x90, 0x00];

/// Reader operation, for call logs and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Open,
    InitiatorInit,
    Select,
    Deselect,
    Presence,
    Transceive,
    Idle,
    SetField,
    Close,
}

type Responder = Arc<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>;

pub(crate) struct MockState {
    name: String,
    open: bool,
    generation: u64,
    initiator: bool,
    field: bool,
    in_field: Vec<Target>,
    selected: Option<Target>,
    failing: HashSet<MockOp>,
    responder: Option<Responder>,
    calls: Vec<MockOp>,
    transmitted: Vec<Vec<u8>>,
    last_blocking: Option<bool>,
    last_timeout: Option<Timeout>,
}

impl MockState {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            open: false,
            generation: 0,
            initiator: false,
            field: false,
            in_field: Vec::new(),
            selected: None,
            failing: HashSet::new(),
            responder: None,
            calls: Vec::new(),
            transmitted: Vec::new(),
            last_blocking: None,
            last_timeout: None,
        }
    }

    /// Log the call and fail it if a failure was injected.
    fn enter(&mut self, op: MockOp) -> Result<()> {
        self.calls.push(op);
        if self.failing.contains(&op) {
            return Err(HardwareError::communication(format!("injected {op:?} failure")));
        }
        Ok(())
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open
    }

    /// Mark the reader open and return the new session generation.
    pub(crate) fn open(&mut self) -> Result<u64> {
        self.enter(MockOp::Open)?;
        if self.open {
            return Err(HardwareError::busy(self.name.clone()));
        }
        self.open = true;
        self.generation += 1;
        Ok(self.generation)
    }

    fn power_off(&mut self) {
        self.initiator = false;
        self.field = false;
        self.selected = None;
    }

    fn selected_in_field(&self) -> Option<&Target> {
        self.selected
            .as_ref()
            .filter(|s| self.field && self.in_field.iter().any(|t| t.same_identity(s)))
    }
}

pub(crate) type Shared = Arc<Mutex<MockState>>;

pub(crate) fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock reader implementing [`NfcDevice`].
///
/// # Examples
///
/// ```
/// use ifdnfc_core::{Target, Technology};
/// use ifdnfc_hardware::mock::MockNfcReader;
/// use ifdnfc_hardware::traits::NfcDevice;
///
/// let (mut reader, handle) = MockNfcReader::new("usb:001:002".parse().unwrap());
/// handle.place_target(Target::type_a(vec![0x04, 0xAB, 0xCD, 0xEF], vec![0x00]).unwrap());
///
/// reader.initiator_init().unwrap();
/// let target = reader
///     .select_passive_target(Technology::TypeA106, None, false)
///     .unwrap()
///     .unwrap();
/// assert_eq!(target.identifier_hex(), "04ABCDEF");
/// ```
pub struct MockNfcReader {
    connstring: ConnString,
    generation: u64,
    state: Shared,
}

impl MockNfcReader {
    /// Create an already opened mock reader.
    pub fn new(connstring: ConnString) -> (Self, MockNfcHandle) {
        let state = Arc::new(Mutex::new(MockState::new(MOCK_READER_NAME.to_string())));
        let generation = lock(&state).open().unwrap_or_default();
        let handle = MockNfcHandle {
            state: Arc::clone(&state),
        };
        (
            Self {
                connstring,
                generation,
                state,
            },
            handle,
        )
    }

    pub(crate) fn from_shared(connstring: ConnString, generation: u64, state: Shared) -> Self {
        Self {
            connstring,
            generation,
            state,
        }
    }

    /// Lock the state, failing if this reader's session has ended.
    fn live(&self, op: MockOp) -> Result<MutexGuard<'_, MockState>> {
        let mut state = lock(&self.state);
        if !state.open || state.generation != self.generation {
            state.calls.push(op);
            return Err(HardwareError::disconnected(self.connstring.as_str()));
        }
        state.enter(op)?;
        Ok(state)
    }
}

impl fmt::Debug for MockNfcReader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MockNfcReader")
            .field("connstring", &self.connstring)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl NfcDevice for MockNfcReader {
    fn info(&self) -> DeviceInfo {
        let name = lock(&self.state).name.clone();
        DeviceInfo::new(name, self.connstring.clone())
    }

    fn connstring(&self) -> &ConnString {
        &self.connstring
    }

    fn initiator_init(&mut self) -> Result<()> {
        let mut state = self.live(MockOp::InitiatorInit)?;
        state.initiator = true;
        state.field = true;
        state.selected = None;
        Ok(())
    }

    fn select_passive_target(
        &mut self,
        technology: Technology,
        init_data: Option<&[u8]>,
        blocking: bool,
    ) -> Result<Option<Target>> {
        let mut state = self.live(MockOp::Select)?;
        state.last_blocking = Some(blocking);
        if !state.initiator || !state.field {
            return Err(HardwareError::communication("reader is not an active initiator"));
        }

        let found = state
            .in_field
            .iter()
            .find(|t| {
                t.technology() == technology
                    && init_data.is_none_or(|data| t.reselect_data() == Some(data))
            })
            .cloned();
        state.selected = found.clone();
        Ok(found)
    }

    fn deselect_target(&mut self) -> Result<()> {
        let mut state = self.live(MockOp::Deselect)?;
        state.selected = None;
        Ok(())
    }

    fn target_is_present(&mut self, target: &Target) -> Result<()> {
        let state = self.live(MockOp::Presence)?;
        match state.selected_in_field() {
            Some(selected) if selected.same_identity(target) => Ok(()),
            _ => Err(HardwareError::target_lost(target.to_string())),
        }
    }

    fn transceive_bytes(
        &mut self,
        tx: &[u8],
        rx_capacity: usize,
        timeout: Timeout,
    ) -> Result<Vec<u8>> {
        let mut state = self.live(MockOp::Transceive)?;
        state.last_timeout = Some(timeout);
        if state.selected_in_field().is_none() {
            return Err(HardwareError::target_lost("no selected target in field"));
        }

        state.transmitted.push(tx.to_vec());
        let response = match &state.responder {
            Some(responder) => responder(tx),
            None => DEFAULT_RESPONSE.to_vec(),
        };
        if response.len() > rx_capacity {
            return Err(HardwareError::Overflow {
                len: response.len(),
                capacity: rx_capacity,
            });
        }
        Ok(response)
    }

    fn idle(&mut self) -> Result<()> {
        let mut state = self.live(MockOp::Idle)?;
        state.power_off();
        Ok(())
    }

    fn set_field(&mut self, enabled: bool) -> Result<()> {
        let mut state = self.live(MockOp::SetField)?;
        state.field = enabled;
        if !enabled {
            state.selected = None;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut state = self.live(MockOp::Close)?;
        state.power_off();
        state.open = false;
        Ok(())
    }
}

impl Drop for MockNfcReader {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        if state.open && state.generation == self.generation {
            state.power_off();
            state.open = false;
        }
    }
}

/// Handle for controlling a mock reader.
///
/// Clones share the same reader.
///
/// # Examples
///
/// ```
/// use ifdnfc_core::Target;
/// use ifdnfc_hardware::mock::{MockNfcReader, MockOp};
///
/// let (_reader, handle) = MockNfcReader::new("usb:001:002".parse().unwrap());
/// let card = Target::type_b([1, 2, 3, 4], [0; 4], [0x00, 0x81, 0x71]);
///
/// handle.place_target(card.clone());
/// handle.fail(MockOp::Transceive);
/// handle.remove_target(&card);
/// assert!(handle.targets().is_empty());
/// ```
#[derive(Clone)]
pub struct MockNfcHandle {
    pub(crate) state: Shared,
}

impl MockNfcHandle {
    /// Bring a target into the field.
    pub fn place_target(&self, target: Target) {
        lock(&self.state).in_field.push(target);
    }

    /// Take a target out of the field. The reader only notices on its next
    /// operation involving the target.
    pub fn remove_target(&self, target: &Target) {
        lock(&self.state).in_field.retain(|t| !t.same_identity(target));
    }

    /// Take every target out of the field.
    pub fn clear_field(&self) {
        lock(&self.state).in_field.clear();
    }

    pub fn targets(&self) -> Vec<Target> {
        lock(&self.state).in_field.clone()
    }

    /// Make every future call of `op` fail until [`recover`](Self::recover).
    pub fn fail(&self, op: MockOp) {
        lock(&self.state).failing.insert(op);
    }

    pub fn recover(&self, op: MockOp) {
        lock(&self.state).failing.remove(&op);
    }

    /// Script the response of the selected target to each transmitted frame.
    pub fn set_responder<F>(&self, responder: F)
    where
        F: Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
    {
        lock(&self.state).responder = Some(Arc::new(responder));
    }

    pub fn is_open(&self) -> bool {
        lock(&self.state).open
    }

    pub fn is_initiator(&self) -> bool {
        lock(&self.state).initiator
    }

    pub fn field_on(&self) -> bool {
        lock(&self.state).field
    }

    pub fn selected(&self) -> Option<Target> {
        lock(&self.state).selected.clone()
    }

    /// Every operation the reader was asked to perform, in order.
    pub fn calls(&self) -> Vec<MockOp> {
        lock(&self.state).calls.clone()
    }

    pub fn count(&self, op: MockOp) -> usize {
        lock(&self.state).calls.iter().filter(|&&c| c == op).count()
    }

    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    /// Frames sent to targets.
    pub fn transmitted(&self) -> Vec<Vec<u8>> {
        lock(&self.state).transmitted.clone()
    }

    /// `blocking` flag of the most recent selection.
    pub fn last_blocking(&self) -> Option<bool> {
        lock(&self.state).last_blocking
    }

    pub fn last_timeout(&self) -> Option<Timeout> {
        lock(&self.state).last_timeout
    }
}

impl fmt::Debug for MockNfcHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("MockNfcHandle")
            .field("name", &state.name)
            .field("open", &state.open)
            .field("targets", &state.in_field.len())
            .finish_non_exhaustive()
    }
}
