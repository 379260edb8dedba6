//! Types shared across reader implementations.

use ifdnfc_core::ConnString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reader metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Reader name (e.g., "ACS ACR122U PICC Interface").
    pub name: String,

    /// Address the reader was opened with.
    pub connstring: ConnString,
}

impl DeviceInfo {
    pub fn new(name: impl Into<String>, connstring: ConnString) -> Self {
        Self {
            name: name.into(),
            connstring,
        }
    }
}

/// Timeout policy of a transceive exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeout {
    /// Whatever the reader uses by default.
    #[default]
    Default,

    /// Wait indefinitely.
    Infinite,

    /// Give up after the given number of milliseconds.
    Millis(u32),
}

impl Timeout {
    /// Raw value in the reader library convention: `-1` for the default,
    /// `0` for no timeout, otherwise milliseconds.
    pub fn as_raw(self) -> i64 {
        match self {
            Timeout::Default => -1,
            Timeout::Infinite => 0,
            Timeout::Millis(ms) => i64::from(ms),
        }
    }

    pub fn is_infinite(self) -> bool {
        matches!(self, Timeout::Infinite)
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Timeout::Default => write!(f, "default"),
            Timeout::Infinite => write!(f, "infinite"),
            Timeout::Millis(ms) => write!(f, "{ms}ms"),
        }
    }
}
