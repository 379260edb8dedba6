//! Core types for presenting a contactless target as a contact smart card.
//!
//! This crate holds the pieces every other `ifdnfc` crate builds on:
//!
//! - [`atr`]: synthesis of a checksummed ATR from contactless discovery data
//! - [`types`]: the [`Target`] registry entry and its [`Technology`]
//! - [`connstring`]: reader addresses and host device names
//! - [`error`]: the error taxonomy and its mapping onto host response codes
//! - [`constants`]: ATR framing, host interface codes and control-channel tags

pub mod atr;
pub mod connstring;
pub mod constants;
pub mod error;
pub mod types;

pub use atr::Atr;
pub use connstring::{ConnString, DeviceName, UsbLocation};
pub use error::{Error, ResponseCode, Result};
pub use types::*;
