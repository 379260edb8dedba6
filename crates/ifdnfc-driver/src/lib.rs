//! IFD handler presenting an NFC reader as a contact smart-card slot.
//!
//! The host loads the handler and drives it through [`IfdHandler`], one
//! call at a time. Everything below the entry points lives in the other
//! `ifdnfc` crates:
//!
//! ```text
//! host ──► IfdHandler ──► SlotMachine ──► DeviceSession ──► NfcDevice
//!              │
//!              └── control channel (ifdnfc-protocol)
//! ```

pub mod config;
pub mod handler;
pub mod logging;

pub use config::HandlerConfig;
pub use handler::{IfdHandler, Transmission, response_code};
