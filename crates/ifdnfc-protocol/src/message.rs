//! Control-channel messages exchanged with the activation utility.
//!
//! # Wire Format
//!
//! ```text
//! request:   TAG                          (SET_INACTIVE = 0, GET_STATUS = 3)
//!            TAG  LEN_LO LEN_HI  CONNSTR  (SET_ACTIVE = 1)
//! response:  STATUS                       (IS_INACTIVE = 0)
//!            STATUS LEN_LO LEN_HI CONNSTR (IS_ACTIVE = 1)
//! ```
//!
//! `LEN` is a little-endian `u16` counting the connection string bytes
//! including the NUL terminator. A declared length that does not match the
//! bytes actually present is rejected, as is a non-empty identifier that
//! does not end in its terminator.
//!
//! # Examples
//!
//! ```
//! use ifdnfc_core::ConnString;
//! use ifdnfc_protocol::{ControlRequest, ControlResponse};
//!
//! let request = ControlRequest::decode(b"\x01\x0c\x00usb:001:002\x00").unwrap();
//! let conn = ConnString::new("usb:001:002").unwrap();
//! assert_eq!(request, ControlRequest::SetActive(Some(conn.clone())));
//!
//! let response = ControlResponse::Active(conn).to_bytes();
//! assert_eq!(&response[..3], &[0x01, 0x0c, 0x00]);
//! ```

use bytes::{Buf, BufMut, BytesMut};

use ifdnfc_core::constants::{
    CONNSTRING_BUFSIZE, IFDNFC_GET_STATUS, IFDNFC_IS_ACTIVE, IFDNFC_IS_INACTIVE,
    IFDNFC_SET_ACTIVE, IFDNFC_SET_INACTIVE,
};
use ifdnfc_core::{ConnString, Error, Result};

/// Size of the length prefix.
pub const LENGTH_PREFIX_LEN: usize = 2;

/// Request sent by the activation utility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlRequest {
    /// Close the device session.
    SetInactive,

    /// Open the device session on the given reader, or on the first
    /// available reader when no connection string is given.
    SetActive(Option<ConnString>),

    /// Report the current status without changing it.
    GetStatus,
}

impl ControlRequest {
    /// Command tag of this request.
    #[must_use]
    pub fn tag(&self) -> u8 {
        match self {
            ControlRequest::SetInactive => IFDNFC_SET_INACTIVE,
            ControlRequest::SetActive(_) => IFDNFC_SET_ACTIVE,
            ControlRequest::GetStatus => IFDNFC_GET_STATUS,
        }
    }

    /// Decode a complete request.
    ///
    /// # Errors
    /// Returns `Error::MalformedMessage` on an empty buffer, an unknown tag,
    /// trailing bytes, or a length prefix that does not match the payload,
    /// and `Error::InvalidConnString` if the identifier is unusable.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut buf = bytes;
        if !buf.has_remaining() {
            return Err(Error::malformed("empty request"));
        }

        match buf.get_u8() {
            IFDNFC_SET_INACTIVE => expect_end(buf).map(|()| ControlRequest::SetInactive),
            IFDNFC_GET_STATUS => expect_end(buf).map(|()| ControlRequest::GetStatus),
            IFDNFC_SET_ACTIVE => {
                let payload = take_length_prefixed(&mut buf)?;
                expect_end(buf)?;
                if payload.is_empty() {
                    Ok(ControlRequest::SetActive(None))
                } else {
                    ConnString::from_wire_bytes(payload).map(|c| ControlRequest::SetActive(Some(c)))
                }
            }
            tag => Err(Error::malformed(format!(
                "request tag must be one of {IFDNFC_SET_ACTIVE} {IFDNFC_SET_INACTIVE} {IFDNFC_GET_STATUS}, got {tag}"
            ))),
        }
    }

    /// Append the wire form to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_u8(self.tag());
        if let ControlRequest::SetActive(conn) = self {
            let wire = conn.as_ref().map(ConnString::to_wire_bytes).unwrap_or_default();
            put_length_prefixed(dst, &wire);
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut dst = BytesMut::new();
        self.encode(&mut dst);
        dst.to_vec()
    }
}

/// Response returned by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlResponse {
    /// No device session is open.
    Inactive,

    /// A device session is open on the given reader.
    Active(ConnString),
}

impl ControlResponse {
    #[must_use]
    pub fn status(&self) -> u8 {
        match self {
            ControlResponse::Inactive => IFDNFC_IS_INACTIVE,
            ControlResponse::Active(_) => IFDNFC_IS_ACTIVE,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, ControlResponse::Active(_))
    }

    /// Number of bytes of the wire form.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match self {
            ControlResponse::Inactive => 1,
            ControlResponse::Active(conn) => 1 + LENGTH_PREFIX_LEN + conn.as_str().len() + 1,
        }
    }

    /// Decode a complete response.
    ///
    /// # Errors
    /// Returns `Error::MalformedMessage` on an empty buffer, an unknown
    /// status, trailing bytes, a missing identifier, or a length mismatch.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut buf = bytes;
        if !buf.has_remaining() {
            return Err(Error::malformed("empty response"));
        }

        match buf.get_u8() {
            IFDNFC_IS_INACTIVE => expect_end(buf).map(|()| ControlResponse::Inactive),
            IFDNFC_IS_ACTIVE => {
                let payload = take_length_prefixed(&mut buf)?;
                expect_end(buf)?;
                ConnString::from_wire_bytes(payload).map(ControlResponse::Active)
            }
            status => Err(Error::malformed(format!("unknown status {status}"))),
        }
    }

    /// Append the wire form to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_u8(self.status());
        if let ControlResponse::Active(conn) = self {
            put_length_prefixed(dst, &conn.to_wire_bytes());
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut dst = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut dst);
        dst.to_vec()
    }
}

/// Read a length prefix and exactly that many following bytes.
fn take_length_prefixed<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8]> {
    if buf.remaining() < LENGTH_PREFIX_LEN {
        return Err(Error::malformed("missing length prefix"));
    }

    let declared = usize::from(buf.get_u16_le());
    if declared > CONNSTRING_BUFSIZE {
        return Err(Error::malformed(format!(
            "declared length {declared} exceeds {CONNSTRING_BUFSIZE}"
        )));
    }
    if buf.remaining() != declared {
        return Err(Error::malformed(format!(
            "declared length {declared} but {} bytes follow",
            buf.remaining()
        )));
    }

    let payload = &buf[..declared];
    buf.advance(declared);
    Ok(payload)
}

fn put_length_prefixed(dst: &mut BytesMut, payload: &[u8]) {
    // ConnString bounds the payload well below u16::MAX.
    dst.reserve(LENGTH_PREFIX_LEN + payload.len());
    dst.put_u16_le(payload.len() as u16);
    dst.put_slice(payload);
}

fn expect_end(buf: &[u8]) -> Result<()> {
    if buf.is_empty() {
        Ok(())
    } else {
        Err(Error::malformed(format!("{} trailing bytes", buf.len())))
    }
}
