//! Mock reader enumeration.
//!
//! A [`MockBus`] plays the role of the reader library's device list: it
//! knows a fixed set of readers by connection string and opens them on
//! request, one session per reader at a time.

use std::sync::{Arc, Mutex};

use ifdnfc_core::ConnString;

use super::reader::{MOCK_READER_NAME, MockNfcHandle, MockNfcReader, MockState, Shared, lock};
use crate::error::{HardwareError, Result};

/// Set of mock readers addressable by connection string.
///
/// # Examples
///
/// ```
/// use ifdnfc_hardware::mock::MockBus;
/// use ifdnfc_hardware::traits::NfcDevice;
///
/// let mut bus = MockBus::new();
/// let _first = bus.attach("usb:001:002".parse().unwrap());
/// let _second = bus.attach("usb:001:003".parse().unwrap());
///
/// let reader = bus.open(None).unwrap();
/// assert_eq!(reader.connstring().as_str(), "usb:001:002");
/// ```
#[derive(Clone, Default)]
pub struct MockBus {
    readers: Vec<(ConnString, Shared)>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plug in a reader and return the handle controlling it.
    pub fn attach(&mut self, connstring: ConnString) -> MockNfcHandle {
        self.attach_named(connstring, MOCK_READER_NAME)
    }

    pub fn attach_named(&mut self, connstring: ConnString, name: &str) -> MockNfcHandle {
        let state = Arc::new(Mutex::new(MockState::new(name.to_string())));
        self.readers.push((connstring, Arc::clone(&state)));
        MockNfcHandle { state }
    }

    /// Connection strings of every attached reader, in attach order.
    pub fn list(&self) -> Vec<ConnString> {
        self.readers.iter().map(|(c, _)| c.clone()).collect()
    }

    /// Open a reader by address, or the first attached reader.
    ///
    /// # Errors
    /// Returns `HardwareError::NoDevice` if nothing matches and
    /// `HardwareError::Busy` if the reader is already open.
    pub fn open(&self, connstring: Option<&ConnString>) -> Result<MockNfcReader> {
        let (conn, state) = match connstring {
            Some(wanted) => self.readers.iter().find(|(c, _)| c == wanted),
            None => self.readers.first(),
        }
        .ok_or_else(|| {
            HardwareError::no_device(
                connstring.map_or_else(|| "no reader attached".to_string(), ConnString::to_string),
            )
        })?;

        let generation = lock(state).open()?;
        Ok(MockNfcReader::from_shared(
            conn.clone(),
            generation,
            Arc::clone(state),
        ))
    }

    /// Whether any attached reader is currently open.
    pub fn any_open(&self) -> bool {
        self.readers.iter().any(|(_, s)| lock(s).is_open())
    }
}

impl std::fmt::Debug for MockBus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("MockBus")
            .field("readers", &self.list())
            .finish()
    }
}
