use crate::{
    Result,
    constants::{ATQB_HEADER, ATQB_LEN, MAX_ATS_LEN, MAX_UID_LEN, MIN_UID_LEN},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Contactless technology (modulation and baud rate) of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Technology {
    /// ISO/IEC 14443 Type A at 106 kbps.
    TypeA106,
    /// ISO/IEC 14443 Type B at 106 kbps.
    TypeB106,
    /// FeliCa (JIS X 6319-4).
    Felica,
    /// Innovision Jewel / Topaz.
    Jewel,
    /// NFCIP-1 data exchange protocol.
    Dep,
    /// Any other kind, identified by an opaque tag.
    Unknown(u8),
}

impl Technology {
    /// Whether targets of this kind carry a command/response interface that
    /// can be presented as a contact card.
    #[must_use]
    pub fn supports_apdu(&self) -> bool {
        matches!(self, Technology::TypeA106 | Technology::TypeB106)
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Technology::TypeA106 => write!(f, "ISO/IEC 14443A (106 kbps)"),
            Technology::TypeB106 => write!(f, "ISO/IEC 14443B (106 kbps)"),
            Technology::Felica => write!(f, "FeliCa"),
            Technology::Jewel => write!(f, "Innovision Jewel"),
            Technology::Dep => write!(f, "D.E.P."),
            Technology::Unknown(tag) => write!(f, "unknown technology 0x{tag:02X}"),
        }
    }
}

/// A discovered contactless target.
///
/// Exactly one variant is active; identity fields only exist on the variant
/// they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// ISO14443-A target: UID and ATS with transport framing stripped.
    TypeA106 { uid: Vec<u8>, ats: Vec<u8> },

    /// ISO14443-B target: fields of the ATQB.
    TypeB106 {
        pupi: [u8; 4],
        application_data: [u8; 4],
        protocol_info: [u8; 3],
    },

    /// Target without command/response capability.
    Other { technology: Technology },
}

impl Target {
    /// Create a Type A target.
    ///
    /// # Errors
    /// Returns `Error::InvalidTarget` if the UID is not 4-10 bytes or the ATS
    /// exceeds 254 bytes.
    pub fn type_a(uid: impl Into<Vec<u8>>, ats: impl Into<Vec<u8>>) -> Result<Self> {
        let uid = uid.into();
        let ats = ats.into();

        if !(MIN_UID_LEN..=MAX_UID_LEN).contains(&uid.len()) {
            return Err(Error::InvalidTarget(format!(
                "UID must be {MIN_UID_LEN}-{MAX_UID_LEN} bytes, got {}",
                uid.len()
            )));
        }
        if ats.len() > MAX_ATS_LEN {
            return Err(Error::InvalidTarget(format!(
                "ATS must be at most {MAX_ATS_LEN} bytes, got {}",
                ats.len()
            )));
        }

        Ok(Target::TypeA106 { uid, ats })
    }

    /// Create a Type B target from its ATQB fields.
    #[must_use]
    pub fn type_b(pupi: [u8; 4], application_data: [u8; 4], protocol_info: [u8; 3]) -> Self {
        Target::TypeB106 {
            pupi,
            application_data,
            protocol_info,
        }
    }

    /// Create a target of a kind without APDU support.
    #[must_use]
    pub fn other(technology: Technology) -> Self {
        Target::Other { technology }
    }

    #[must_use]
    pub fn technology(&self) -> Technology {
        match self {
            Target::TypeA106 { .. } => Technology::TypeA106,
            Target::TypeB106 { .. } => Technology::TypeB106,
            Target::Other { technology } => *technology,
        }
    }

    /// Initiator data that selects this exact target again.
    ///
    /// Type A targets are reselected by UID; other kinds are reselected by
    /// technology alone and checked with [`Target::same_identity`].
    #[must_use]
    pub fn reselect_data(&self) -> Option<&[u8]> {
        match self {
            Target::TypeA106 { uid, .. } => Some(uid),
            _ => None,
        }
    }

    /// Whether `other` is the same physical target as `self`.
    #[must_use]
    pub fn same_identity(&self, other: &Target) -> bool {
        match (self, other) {
            (Target::TypeA106 { uid: a, .. }, Target::TypeA106 { uid: b, .. }) => a == b,
            (Target::TypeB106 { pupi: a, .. }, Target::TypeB106 { pupi: b, .. }) => a == b,
            (Target::Other { technology: a }, Target::Other { technology: b }) => a == b,
            _ => false,
        }
    }

    /// Synthetic 12-byte ATQB of a Type B target.
    #[must_use]
    pub fn atqb(&self) -> Option<[u8; ATQB_LEN]> {
        match self {
            Target::TypeB106 {
                pupi,
                application_data,
                protocol_info,
            } => {
                let mut atqb = [0u8; ATQB_LEN];
                atqb[0] = ATQB_HEADER;
                atqb[1..5].copy_from_slice(pupi);
                atqb[5..9].copy_from_slice(application_data);
                atqb[9..12].copy_from_slice(protocol_info);
                Some(atqb)
            }
            _ => None,
        }
    }

    /// Discovery payload fed to the ATR synthesizer: the ATS for Type A,
    /// the synthetic ATQB for Type B, nothing otherwise.
    #[must_use]
    pub fn atr_payload(&self) -> Cow<'_, [u8]> {
        match self {
            Target::TypeA106 { ats, .. } => Cow::Borrowed(ats),
            Target::TypeB106 { .. } => Cow::Owned(self.atqb().map(Vec::from).unwrap_or_default()),
            Target::Other { .. } => Cow::Borrowed(&[]),
        }
    }

    /// UID (Type A) or PUPI (Type B) as uppercase hex.
    #[must_use]
    pub fn identifier_hex(&self) -> String {
        match self {
            Target::TypeA106 { uid, .. } => hex(uid),
            Target::TypeB106 { pupi, .. } => hex(pupi),
            Target::Other { .. } => String::new(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Target::Other { technology } => write!(f, "{technology}"),
            _ => write!(f, "{} {}", self.technology(), self.identifier_hex()),
        }
    }
}

/// Format bytes as contiguous uppercase hex.
#[must_use]
pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}
