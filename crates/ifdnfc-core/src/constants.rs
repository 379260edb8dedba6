//! Constants for ATR synthesis and the contact-card host interface.
//!
//! This module collects every numeric value that has to match an external
//! contract: the fixed ATR framing bytes, the response codes and capability
//! tags of the IFD handler interface, and the tags of the out-of-band control
//! channel used by the activation utility.
//!
//! # ATR Framing
//!
//! Every synthesized ATR has the same fixed prefix:
//!
//! ```text
//! TS   T0          TA1  TB1  [historical bytes...]  TCK
//! 3B   80 + hb     80   01   ...                    XOR(T0..last hb)
//! ```
//!
//! ```
//! use ifdnfc_core::constants::*;
//!
//! assert_eq!(ATR_TS, 0x3B);
//! assert_eq!(ATR_FRAMING_LEN + 1, 5); // shortest possible ATR
//! ```

// ============================================================================
// ATR framing
// ============================================================================

/// Initial character: direct convention.
pub const ATR_TS: u8 = 0x3B;

/// Base of the format character. The low nibble carries the number of
/// historical bytes, bit 8 announces TD1.
pub const ATR_T0_BASE: u8 = 0x80;

/// First interface byte following T0.
pub const ATR_TA1: u8 = 0x80;

/// Second interface byte: protocol T=1.
pub const ATR_TB1: u8 = 0x01;

/// Number of framing bytes preceding the historical bytes (TS, T0, TA1, TB1).
pub const ATR_FRAMING_LEN: usize = 4;

/// Upper bound on the number of historical bytes the synthesizer accepts.
///
/// Matches the largest ATS a contactless reader can report (254 bytes
/// including the format byte).
pub const MAX_HISTORICAL_BYTES: usize = 253;

/// Largest ATR the synthesizer can ever produce.
pub const MAX_SYNTHESIZED_ATR_LEN: usize = ATR_FRAMING_LEN + MAX_HISTORICAL_BYTES + 1;

/// ATR buffer size of the contact-card host API.
pub const MAX_ATR_SIZE: usize = 33;

/// Leading byte of an ISO14443-B ATQB.
pub const ATQB_HEADER: u8 = 0x50;

/// Length of the synthetic ATQB built from a Type B target.
pub const ATQB_LEN: usize = 12;

/// Format byte bits announcing TA(1), TB(1) and TC(1) in an ATS.
pub const ATS_TA_PRESENT: u8 = 0x10;
/// See [`ATS_TA_PRESENT`].
pub const ATS_TB_PRESENT: u8 = 0x20;
/// See [`ATS_TA_PRESENT`].
pub const ATS_TC_PRESENT: u8 = 0x40;

/// Maximum length of an ATS payload as reported by the transport.
pub const MAX_ATS_LEN: usize = 254;

/// Minimum UID length (ISO14443-3 single size).
pub const MIN_UID_LEN: usize = 4;

/// Maximum UID length (ISO14443-3 triple size).
pub const MAX_UID_LEN: usize = 10;

// ============================================================================
// Connection strings
// ============================================================================

/// Buffer size of a connection string on the reader library side.
///
/// Connection strings must be strictly shorter so the NUL terminator fits.
pub const CONNSTRING_BUFSIZE: usize = 1024;

/// Device name prefix used when the host opens a channel by number.
pub const PCSC_DEVICE_PREFIX: &str = "/dev/pcsc/";

/// Reader name presented to the host.
pub const READER_NAME: &str = "IFD-NFC";

// ============================================================================
// IFD handler response codes
// ============================================================================

/// Operation succeeded.
pub const IFD_SUCCESS: u32 = 0;
/// Capability tag not recognised.
pub const IFD_ERROR_TAG: u32 = 600;
/// Capability could not be set.
pub const IFD_ERROR_SET_FAILURE: u32 = 601;
/// Capability is read-only.
pub const IFD_ERROR_VALUE_READ_ONLY: u32 = 602;
/// Protocol parameter selection failed.
pub const IFD_ERROR_PTS_FAILURE: u32 = 605;
/// Action or control code not supported.
pub const IFD_ERROR_NOT_SUPPORTED: u32 = 606;
/// Requested protocol not supported.
pub const IFD_PROTOCOL_NOT_SUPPORTED: u32 = 607;
/// Power action failed.
pub const IFD_ERROR_POWER_ACTION: u32 = 608;
/// Transport or device failure.
pub const IFD_COMMUNICATION_ERROR: u32 = 612;
/// Card did not answer in time.
pub const IFD_RESPONSE_TIMEOUT: u32 = 613;
/// No card in the slot.
pub const IFD_ICC_NOT_PRESENT: u32 = 614;
/// Card in the slot.
pub const IFD_ICC_PRESENT: u32 = 615;

// ============================================================================
// Capability tags
// ============================================================================

/// ATR of the card in the slot.
pub const TAG_IFD_ATR: u32 = 0x0303;
/// Number of slots of the reader.
pub const TAG_IFD_SLOTS_NUMBER: u32 = 0x0FAE;
/// Number of readers that may be used simultaneously.
pub const TAG_IFD_SIMULTANEOUS_ACCESS: u32 = 0x0FAF;
/// Whether the driver may be called from several threads.
pub const TAG_IFD_THREAD_SAFE: u32 = 0x0FAD;
/// Whether slots may be used from several threads.
pub const TAG_IFD_SLOT_THREAD_SAFE: u32 = 0x0FAC;
/// Attribute alias of [`TAG_IFD_ATR`].
pub const SCARD_ATTR_ATR_STRING: u32 = 0x0009_0303;

// ============================================================================
// Power actions and protocols
// ============================================================================

/// Energize the card.
pub const IFD_POWER_UP: u32 = 500;
/// De-energize the card.
pub const IFD_POWER_DOWN: u32 = 501;
/// Warm reset.
pub const IFD_RESET: u32 = 502;

/// Contact protocol T=0.
pub const SCARD_PROTOCOL_T0: u32 = 0x0001;
/// Contact protocol T=1, the only one offered.
pub const SCARD_PROTOCOL_T1: u32 = 0x0002;

// ============================================================================
// Control channel
// ============================================================================

/// Control code of the activation channel.
pub const IFDNFC_CTRL_ACTIVE: u32 = 1;

/// `SCARD_CTL_CODE(1)` as delivered by hosts that wrap control codes.
pub const IFDNFC_CTRL_ACTIVE_WRAPPED: u32 = 0x4200_0000 + IFDNFC_CTRL_ACTIVE;

/// Request: deactivate.
pub const IFDNFC_SET_INACTIVE: u8 = 0;
/// Request: activate with a connection string.
pub const IFDNFC_SET_ACTIVE: u8 = 1;
/// Request: report status only.
pub const IFDNFC_GET_STATUS: u8 = 3;

/// Response: no device session.
pub const IFDNFC_IS_INACTIVE: u8 = 0;
/// Response: device session open, connection string follows.
pub const IFDNFC_IS_ACTIVE: u8 = 1;
