//! ATR synthesis from contactless discovery data.
//!
//! A contactless target has no Answer To Reset of its own. The synthesizer
//! derives one from the discovery response so the target can be presented to
//! the host as a contact card speaking T=1:
//!
//! ```text
//! 3B  80+hb  80  01  <historical bytes>  TCK
//! ```
//!
//! The historical bytes are taken from the ATS of a Type A target after
//! skipping the format byte and the interface bytes it announces. A Type B
//! target is first rewritten as a synthetic 12-byte ATQB and then run through
//! the same extraction, so both kinds share the framing above.
//!
//! Any other technology yields an empty ATR. That is a successful result: it
//! marks a card without command/response capability.
//!
//! # Examples
//!
//! ```
//! use ifdnfc_core::atr::synthesize;
//! use ifdnfc_core::Technology;
//!
//! let atr = synthesize(Technology::TypeA106, &[0x00, 0xAA, 0xBB]).unwrap();
//! assert_eq!(atr.as_bytes(), &[0x3B, 0x82, 0x80, 0x01, 0xAA, 0xBB, 0x12]);
//! assert!(atr.verify_checksum());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    Result,
    constants::*,
    error::Error,
    types::{Target, Technology, hex},
};

/// A synthesized Answer To Reset.
///
/// Either empty (target without APDU support) or
/// `TS T0 TA1 TB1 [historical bytes] TCK`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Atr(Vec<u8>);

impl Atr {
    /// The empty ATR.
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Synthesize the ATR describing `target`.
    ///
    /// # Errors
    /// Returns `Error::TooManyHistoricalBytes` if the discovery payload
    /// carries more historical bytes than an ATR can hold.
    pub fn for_target(target: &Target) -> Result<Self> {
        synthesize(target.technology(), &target.atr_payload())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Historical bytes between TB1 and TCK.
    #[must_use]
    pub fn historical_bytes(&self) -> &[u8] {
        if self.0.len() <= ATR_FRAMING_LEN {
            return &[];
        }
        &self.0[ATR_FRAMING_LEN..self.0.len() - 1]
    }

    /// The check byte, if the ATR is not empty.
    #[must_use]
    pub fn tck(&self) -> Option<u8> {
        self.0.last().copied()
    }

    /// Check that TCK equals the XOR of T0 through the last historical byte.
    ///
    /// The empty ATR carries no checksum and verifies trivially.
    #[must_use]
    pub fn verify_checksum(&self) -> bool {
        match self.0.len() {
            0 => true,
            n if n <= ATR_FRAMING_LEN => false,
            n => checksum(&self.0[1..n - 1]) == self.0[n - 1],
        }
    }
}

impl AsRef<[u8]> for Atr {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Atr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|b| format!("{b:02X}")).collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// XOR of all bytes.
#[must_use]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc ^ b)
}

/// Historical bytes of a discovery payload in ATS layout.
///
/// Bits 0x10, 0x20 and 0x40 of the format byte each announce one interface
/// byte before the historical bytes.
#[must_use]
pub fn historical_bytes(payload: &[u8]) -> &[u8] {
    let Some(&format) = payload.first() else {
        return &[];
    };

    let interface_bytes = [ATS_TA_PRESENT, ATS_TB_PRESENT, ATS_TC_PRESENT]
        .iter()
        .filter(|&&bit| format & bit != 0)
        .count();
    let idx = 1 + interface_bytes;

    payload.get(idx..).unwrap_or(&[])
}

/// Length of the ATR that `technology` and `payload` synthesize to.
///
/// # Errors
/// Returns `Error::TooManyHistoricalBytes` when the payload exceeds
/// [`MAX_HISTORICAL_BYTES`].
pub fn synthesized_len(technology: Technology, payload: &[u8]) -> Result<usize> {
    if !technology.supports_apdu() {
        return Ok(0);
    }

    let count = historical_bytes(payload).len();
    if count > MAX_HISTORICAL_BYTES {
        return Err(Error::TooManyHistoricalBytes {
            count,
            max: MAX_HISTORICAL_BYTES,
        });
    }
    Ok(ATR_FRAMING_LEN + count + 1)
}

/// Synthesize an ATR into a caller-supplied buffer.
///
/// Returns the number of bytes written. `atr.len()` is the declared capacity.
///
/// # Errors
/// - `Error::BufferTooSmall` if `atr` cannot hold the result; nothing is
///   written in that case.
/// - `Error::TooManyHistoricalBytes` if the payload is oversized.
pub fn synthesize_into(technology: Technology, payload: &[u8], atr: &mut [u8]) -> Result<usize> {
    if !technology.supports_apdu() {
        info!(%technology, "Returning empty ATR for card without APDU support");
        return Ok(0);
    }

    debug!(%technology, payload = %hex(payload), "Calculating ATR from discovery payload");

    let len = synthesized_len(technology, payload)?;
    if atr.len() < len {
        return Err(Error::BufferTooSmall {
            needed: len,
            capacity: atr.len(),
        });
    }

    let hb = historical_bytes(payload);
    debug!(
        interface_bytes = payload.len().saturating_sub(hb.len()).saturating_sub(1),
        historical_bytes = hb.len(),
        "Parsed discovery payload"
    );

    let tck_pos = ATR_FRAMING_LEN + hb.len();
    atr[0] = ATR_TS;
    // hb.len() <= MAX_HISTORICAL_BYTES, so the sum stays within u8.
    atr[1] = ATR_T0_BASE.wrapping_add(hb.len() as u8);
    atr[2] = ATR_TA1;
    atr[3] = ATR_TB1;
    atr[ATR_FRAMING_LEN..tck_pos].copy_from_slice(hb);
    atr[tck_pos] = checksum(&atr[1..tck_pos]);

    Ok(len)
}

/// Synthesize an ATR.
///
/// # Errors
/// Returns `Error::TooManyHistoricalBytes` if the payload is oversized.
pub fn synthesize(technology: Technology, payload: &[u8]) -> Result<Atr> {
    let mut buf = [0u8; MAX_SYNTHESIZED_ATR_LEN];
    let len = synthesize_into(technology, payload, &mut buf)?;
    Ok(Atr(buf[..len].to_vec()))
}
