//! Codecs for carrying control messages over a byte stream.
//!
//! The host hands control buffers to the driver one call at a time, so the
//! driver itself decodes with [`ControlRequest::decode`]. These codecs serve
//! tools that relay control messages over a pipe or socket: the frame length
//! is derived from the tag and the length prefix, so several messages can be
//! queued back to back.
//!
//! ```text
//! byte stream -> ControlCodec       -> ControlRequest
//! ControlResponse -> ControlCodec   -> byte stream
//! byte stream -> ControlClientCodec -> ControlResponse
//! ```
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use tokio_util::codec::Decoder;
//! use ifdnfc_protocol::{ControlCodec, ControlRequest};
//!
//! let mut codec = ControlCodec::new();
//! let mut buffer = BytesMut::from(&b"\x03\x00"[..]);
//!
//! assert_eq!(codec.decode(&mut buffer).unwrap(), Some(ControlRequest::GetStatus));
//! assert_eq!(codec.decode(&mut buffer).unwrap(), Some(ControlRequest::SetInactive));
//! assert_eq!(codec.decode(&mut buffer).unwrap(), None);
//! ```

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::message::{ControlRequest, ControlResponse, LENGTH_PREFIX_LEN};
use ifdnfc_core::constants::{
    CONNSTRING_BUFSIZE, IFDNFC_GET_STATUS, IFDNFC_IS_ACTIVE, IFDNFC_IS_INACTIVE,
    IFDNFC_SET_ACTIVE, IFDNFC_SET_INACTIVE,
};
use ifdnfc_core::{Error, Result};

/// Default maximum frame size: tag, length prefix and a full connstring
/// buffer.
const DEFAULT_MAX_FRAME_SIZE: usize = 1 + LENGTH_PREFIX_LEN + CONNSTRING_BUFSIZE;

/// Length of the frame at the head of `src`, or `None` if more bytes are
/// needed to tell.
fn frame_len(src: &[u8], bare_tags: &[u8], prefixed_tag: u8, max: usize) -> Result<Option<usize>> {
    let Some(&tag) = src.first() else {
        return Ok(None);
    };

    if bare_tags.contains(&tag) {
        return Ok(Some(1));
    }
    if tag != prefixed_tag {
        return Err(Error::malformed(format!("unknown tag {tag}")));
    }
    if src.len() < 1 + LENGTH_PREFIX_LEN {
        return Ok(None);
    }

    let declared = usize::from(u16::from_le_bytes([src[1], src[2]]));
    let total = 1 + LENGTH_PREFIX_LEN + declared;
    if total > max {
        return Err(Error::malformed(format!(
            "frame of {total} bytes exceeds {max}"
        )));
    }
    Ok(Some(total))
}

fn split_frame(src: &mut BytesMut, len: Option<usize>) -> Option<BytesMut> {
    match len {
        Some(len) if src.len() >= len => Some(src.split_to(len)),
        Some(len) => {
            src.reserve(len - src.len());
            None
        }
        None => None,
    }
}

/// Driver-side codec: decodes requests, encodes responses.
#[derive(Debug, Clone)]
pub struct ControlCodec {
    max_frame_size: usize,
}

impl ControlCodec {
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Create a codec that rejects frames longer than `max_frame_size`.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for ControlCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ControlCodec {
    type Item = ControlRequest;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<ControlRequest>> {
        let len = frame_len(
            src,
            &[IFDNFC_SET_INACTIVE, IFDNFC_GET_STATUS],
            IFDNFC_SET_ACTIVE,
            self.max_frame_size,
        )?;

        match split_frame(src, len) {
            Some(frame) => {
                trace!(len = frame.len(), "decoding control request");
                ControlRequest::decode(&frame).map(Some)
            }
            None => Ok(None),
        }
    }
}

impl Encoder<ControlResponse> for ControlCodec {
    type Error = Error;

    fn encode(&mut self, item: ControlResponse, dst: &mut BytesMut) -> Result<()> {
        let len = item.encoded_len();
        if len > self.max_frame_size {
            return Err(Error::malformed(format!(
                "frame of {len} bytes exceeds {}",
                self.max_frame_size
            )));
        }
        item.encode(dst);
        Ok(())
    }
}

/// Utility-side codec: encodes requests, decodes responses.
#[derive(Debug, Clone)]
pub struct ControlClientCodec {
    max_frame_size: usize,
}

impl ControlClientCodec {
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for ControlClientCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ControlClientCodec {
    type Item = ControlResponse;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<ControlResponse>> {
        let len = frame_len(
            src,
            &[IFDNFC_IS_INACTIVE],
            IFDNFC_IS_ACTIVE,
            self.max_frame_size,
        )?;

        match split_frame(src, len) {
            Some(frame) => ControlResponse::decode(&frame).map(Some),
            None => Ok(None),
        }
    }
}

impl Encoder<ControlRequest> for ControlClientCodec {
    type Error = Error;

    fn encode(&mut self, item: ControlRequest, dst: &mut BytesMut) -> Result<()> {
        item.encode(dst);
        Ok(())
    }
}
