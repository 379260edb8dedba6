//! Reader addresses: connection strings and host device names.
//!
//! A [`ConnString`] addresses one physical reader, in the `driver[:param...]`
//! form understood by the reader library (`"pn533_usb:001:002"`,
//! `"usb:001:002"`). It is what the activation utility sends over the
//! control channel.
//!
//! A [`DeviceName`] is what the host hands to the driver when it creates a
//! channel. For hot-plugged USB readers the name embeds the bus and device
//! numbers, which [`DeviceName::parse`] extracts into a [`UsbLocation`].
//!
//! ```
//! use ifdnfc_core::connstring::DeviceName;
//!
//! let name = DeviceName::parse("usb:072f/2200:libudev:0:/dev/bus/usb/001/002").unwrap();
//! let location = name.usb_location().unwrap();
//! assert_eq!(location.connstring().as_str(), "usb:001:002");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Result, constants::CONNSTRING_BUFSIZE, error::Error};

const USB_BUS_PATH: &str = "/dev/bus/usb/";
const LIBUSB_MARKER: &str = ":libusb-1.0:";

/// Address of a physical reader.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConnString(String);

impl ConnString {
    /// Parse and validate a connection string.
    ///
    /// # Errors
    /// Returns `Error::InvalidConnString` if the string is empty, has an
    /// empty driver name, contains a NUL byte, or does not fit the reader
    /// library's buffer.
    pub fn new(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidConnString("empty".to_string()));
        }
        if s.len() >= CONNSTRING_BUFSIZE {
            return Err(Error::InvalidConnString(format!(
                "length {} exceeds {}",
                s.len(),
                CONNSTRING_BUFSIZE - 1
            )));
        }
        if s.contains('\0') {
            return Err(Error::InvalidConnString("embedded NUL".to_string()));
        }
        if s.split(':').next().is_none_or(str::is_empty) {
            return Err(Error::InvalidConnString(format!("missing driver in {s:?}")));
        }
        Ok(Self(s.to_string()))
    }

    /// Decode the control-channel form: UTF-8 text ending in exactly one NUL.
    ///
    /// The terminator is mandatory so that decoding and [`to_wire_bytes`]
    /// agree byte for byte.
    ///
    /// # Errors
    /// Returns `Error::InvalidConnString` when the terminator is missing or
    /// not the only NUL, and on invalid UTF-8 or content.
    ///
    /// [`to_wire_bytes`]: ConnString::to_wire_bytes
    pub fn from_wire_bytes(bytes: &[u8]) -> Result<Self> {
        let Some((&0, text)) = bytes.split_last() else {
            return Err(Error::InvalidConnString(
                "missing NUL terminator".to_string(),
            ));
        };
        if text.contains(&0) {
            return Err(Error::InvalidConnString(
                "NUL inside connection string".to_string(),
            ));
        }
        let s = std::str::from_utf8(text)
            .map_err(|e| Error::InvalidConnString(format!("not UTF-8: {e}")))?;
        Self::new(s)
    }

    /// Control-channel form, including the NUL terminator.
    #[must_use]
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.0.len() + 1);
        bytes.extend_from_slice(self.0.as_bytes());
        bytes.push(0);
        bytes
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Driver part, before the first `:`.
    #[must_use]
    pub fn driver(&self) -> &str {
        self.0.split(':').next().unwrap_or_default()
    }

    /// Parameters following the driver, split on `:`.
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.0.split(':').skip(1)
    }
}

impl fmt::Display for ConnString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ConnString {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ConnString::new(s)
    }
}

impl TryFrom<String> for ConnString {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        ConnString::new(&s)
    }
}

impl From<ConnString> for String {
    fn from(c: ConnString) -> Self {
        c.0
    }
}

/// Bus and device number of a USB reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsbLocation {
    pub bus: u16,
    pub device: u16,
}

impl UsbLocation {
    /// Generic USB connection string, `usb:BBB:DDD`.
    #[must_use]
    pub fn connstring(&self) -> ConnString {
        ConnString(format!("usb:{:03}:{:03}", self.bus, self.device))
    }
}

/// Device name given by the host when opening a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceName {
    raw: String,
    usb: Option<UsbLocation>,
}

impl DeviceName {
    /// Parse a host device name.
    ///
    /// Recognised forms carrying a USB location:
    /// - `/dev/bus/usb/BBB/DDD`, alone or as the tail of a libudev name
    /// - `usb:VVVV/PPPP:libusb-1.0:B:D:I`
    ///
    /// Anything else parses with no location.
    ///
    /// # Errors
    /// Returns `Error::InvalidDeviceName` when a recognised form carries
    /// malformed bus or device numbers.
    pub fn parse(name: &str) -> Result<Self> {
        let usb = if let Some(pos) = name.find(USB_BUS_PATH) {
            let rest = &name[pos + USB_BUS_PATH.len()..];
            let mut parts = rest.split('/');
            Some(parse_location(name, parts.next(), parts.next())?)
        } else if let Some(pos) = name.find(LIBUSB_MARKER) {
            let rest = &name[pos + LIBUSB_MARKER.len()..];
            let mut parts = rest.split(':');
            Some(parse_location(name, parts.next(), parts.next())?)
        } else {
            None
        };

        Ok(Self {
            raw: name.to_string(),
            usb,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn usb_location(&self) -> Option<UsbLocation> {
        self.usb
    }

    /// Connection string of the reader this name designates, if known.
    #[must_use]
    pub fn connstring(&self) -> Option<ConnString> {
        self.usb.map(|location| location.connstring())
    }
}

fn parse_location(name: &str, bus: Option<&str>, device: Option<&str>) -> Result<UsbLocation> {
    let number = |part: Option<&str>, what: &str| -> Result<u16> {
        part.filter(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| Error::InvalidDeviceName(format!("bad USB {what} number in {name:?}")))
    };

    Ok(UsbLocation {
        bus: number(bus, "bus")?,
        device: number(device, "device")?,
    })
}
