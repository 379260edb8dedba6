//! Mock reader implementation for testing and development.
//!
//! Simulated readers are controlled programmatically and need no hardware.

pub mod bus;
pub mod reader;

pub use bus::MockBus;
pub use reader::{DEFAULT_RESPONSE, MOCK_READER_NAME, MockNfcHandle, MockNfcReader, MockOp};
