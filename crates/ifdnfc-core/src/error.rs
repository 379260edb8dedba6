use thiserror::Error;

use crate::constants::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Transport and device errors
    #[error("Communication error: {0}")]
    Communication(String),

    #[error("Hardware error: {0}")]
    Hardware(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Buffer too small: need {needed} bytes, capacity is {capacity}")]
    BufferTooSmall { needed: usize, capacity: usize },

    // Card errors
    #[error("No card present")]
    CardAbsent,

    #[error("Power action failed: {0}")]
    PowerAction(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Too many historical bytes: {count} (max {max})")]
    TooManyHistoricalBytes { count: usize, max: usize },

    // Host interface errors
    #[error("Action not supported: {0}")]
    ActionNotSupported(String),

    #[error("Unknown capability tag: 0x{0:04X}")]
    UnknownTag(u32),

    #[error("Capability 0x{0:04X} is read-only")]
    ReadOnly(u32),

    #[error("Protocol not supported: 0x{0:04X}")]
    ProtocolNotSupported(u32),

    // Control channel errors
    #[error("Malformed control message: {0}")]
    MalformedMessage(String),

    #[error("Invalid connection string: {0}")]
    InvalidConnString(String),

    #[error("Invalid device name: {0}")]
    InvalidDeviceName(String),

    // State machine errors
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

/// Response code reported to the host for a finished entry-point call.
///
/// Every [`Error`] maps to exactly one code through [`Error::response_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    Success,
    UnknownTag,
    ReadOnly,
    NotSupported,
    ProtocolNotSupported,
    PowerAction,
    CommunicationError,
    IccNotPresent,
    IccPresent,
}

impl ResponseCode {
    /// Numeric value of the code in the IFD handler interface.
    pub fn as_u32(self) -> u32 {
        match self {
            Self::Success => IFD_SUCCESS,
            Self::UnknownTag => IFD_ERROR_TAG,
            Self::ReadOnly => IFD_ERROR_VALUE_READ_ONLY,
            Self::NotSupported => IFD_ERROR_NOT_SUPPORTED,
            Self::ProtocolNotSupported => IFD_PROTOCOL_NOT_SUPPORTED,
            Self::PowerAction => IFD_ERROR_POWER_ACTION,
            Self::CommunicationError => IFD_COMMUNICATION_ERROR,
            Self::IccNotPresent => IFD_ICC_NOT_PRESENT,
            Self::IccPresent => IFD_ICC_PRESENT,
        }
    }
}

impl Error {
    /// Map this error onto the host's response code taxonomy.
    pub fn response_code(&self) -> ResponseCode {
        match self {
            Error::Communication(_)
            | Error::Hardware(_)
            | Error::Io(_)
            | Error::BufferTooSmall { .. }
            | Error::InvalidTarget(_)
            | Error::TooManyHistoricalBytes { .. }
            | Error::MalformedMessage(_)
            | Error::InvalidConnString(_)
            | Error::InvalidDeviceName(_)
            | Error::InvalidStateTransition { .. } => ResponseCode::CommunicationError,
            Error::CardAbsent => ResponseCode::IccNotPresent,
            Error::PowerAction(_) => ResponseCode::PowerAction,
            Error::ActionNotSupported(_) => ResponseCode::NotSupported,
            Error::UnknownTag(_) => ResponseCode::UnknownTag,
            Error::ReadOnly(_) => ResponseCode::ReadOnly,
            Error::ProtocolNotSupported(_) => ResponseCode::ProtocolNotSupported,
        }
    }

    pub fn communication(message: impl Into<String>) -> Self {
        Error::Communication(message.into())
    }

    pub fn power_action(message: impl Into<String>) -> Self {
        Error::PowerAction(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedMessage(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Error::communication("reader unplugged"), ResponseCode::CommunicationError, 612)]
    #[case(Error::BufferTooSmall { needed: 7, capacity: 5 }, ResponseCode::CommunicationError, 612)]
    #[case(Error::malformed("length mismatch"), ResponseCode::CommunicationError, 612)]
    #[case(Error::CardAbsent, ResponseCode::IccNotPresent, 614)]
    #[case(Error::power_action("field"), ResponseCode::PowerAction, 608)]
    #[case(Error::ActionNotSupported("503".into()), ResponseCode::NotSupported, 606)]
    #[case(Error::UnknownTag(0x1234), ResponseCode::UnknownTag, 600)]
    #[case(Error::ReadOnly(0x0303), ResponseCode::ReadOnly, 602)]
    #[case(Error::ProtocolNotSupported(1), ResponseCode::ProtocolNotSupported, 607)]
    fn test_response_code_mapping(
        #[case] error: Error,
        #[case] code: ResponseCode,
        #[case] value: u32,
    ) {
        assert_eq!(error.response_code(), code);
        assert_eq!(code.as_u32(), value);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(Error::UnknownTag(0x0FAE).to_string(), "Unknown capability tag: 0x0FAE");
        assert_eq!(
            Error::BufferTooSmall { needed: 7, capacity: 5 }.to_string(),
            "Buffer too small: need 7 bytes, capacity is 5"
        );
        assert_eq!(Error::CardAbsent.to_string(), "No card present");
    }
}
