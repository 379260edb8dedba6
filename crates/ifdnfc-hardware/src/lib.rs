//! Reader abstraction for the NFC-to-contact-card adapter.
//!
//! The adapter drives one contactless reader in initiator mode. This crate
//! defines the reader primitives the slot state machine needs, the session
//! that owns the open reader, and a mock reader for tests.
//!
//! # Layers
//!
//! - [`NfcDevice`]: one reader, one blocking operation per call.
//! - [`AnyNfcDevice`]: enum dispatch over concrete readers.
//! - [`Backend`] / [`Connector`]: lists readers and opens one by address.
//! - [`DeviceSession`]: owns the backend and at most one open reader.
//!
//! # Error Handling
//!
//! Every primitive returns [`Result<T>`][error::Result] with a
//! [`HardwareError`]. Converting into [`ifdnfc_core::Error`] yields the
//! communication error family.
//!
//! [`NfcDevice`]: traits::NfcDevice
//! [`AnyNfcDevice`]: devices::AnyNfcDevice
//! [`Backend`]: connector::Backend
//! [`Connector`]: connector::Connector
//! [`DeviceSession`]: session::DeviceSession

pub mod connector;
pub mod devices;
pub mod error;
pub mod mock;
pub mod session;
pub mod traits;
pub mod types;

pub use connector::{Backend, Connector};
pub use devices::AnyNfcDevice;
pub use error::{HardwareError, Result};
pub use session::DeviceSession;
pub use traits::NfcDevice;
pub use types::{DeviceInfo, Timeout};
