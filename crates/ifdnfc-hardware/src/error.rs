//! Error types for reader operations.
//!
//! Device primitives fail with [`HardwareError`]. The slot layer decides what
//! a failure means for presence and power, then converts it into
//! [`ifdnfc_core::Error`], where every device failure is a communication
//! error from the host's point of view.

/// Result type alias for reader operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while driving a reader.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// No reader matched the request.
    #[error("No reader found: {0}")]
    NoDevice(String),

    /// The reader exists but is already held by another session.
    #[error("Reader busy: {device}")]
    Busy { device: String },

    /// The session has no open reader.
    #[error("No reader open")]
    NotOpen,

    /// Reader was unplugged or closed underneath the session.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// The target left the field or stopped answering.
    #[error("Target lost: {0}")]
    TargetLost(String),

    /// Reader communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Response does not fit the receive buffer.
    #[error("Response of {len} bytes exceeds receive capacity {capacity}")]
    Overflow { len: usize, capacity: usize },

    /// Reader could not be put into initiator mode.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },
}

impl HardwareError {
    pub fn no_device(what: impl Into<String>) -> Self {
        Self::NoDevice(what.into())
    }

    pub fn busy(device: impl Into<String>) -> Self {
        Self::Busy {
            device: device.into(),
        }
    }

    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    pub fn target_lost(message: impl Into<String>) -> Self {
        Self::TargetLost(message.into())
    }

    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    /// Whether the failure means the target is gone rather than the reader.
    pub fn is_target_lost(&self) -> bool {
        matches!(self, Self::TargetLost(_))
    }
}

impl From<HardwareError> for ifdnfc_core::Error {
    fn from(e: HardwareError) -> Self {
        match e {
            HardwareError::Overflow { len, capacity } => ifdnfc_core::Error::BufferTooSmall {
                needed: len,
                capacity,
            },
            other => ifdnfc_core::Error::Hardware(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifdnfc_core::ResponseCode;
    use rstest::rstest;

    #[test]
    fn test_disconnected_error() {
        let error = HardwareError::disconnected("ACR122U");
        assert!(matches!(error, HardwareError::Disconnected { .. }));
        assert_eq!(error.to_string(), "Device disconnected: ACR122U");
    }

    #[test]
    fn test_overflow_display() {
        let error = HardwareError::Overflow { len: 300, capacity: 258 };
        assert_eq!(
            error.to_string(),
            "Response of 300 bytes exceeds receive capacity 258"
        );
    }

    #[rstest]
    #[case(HardwareError::no_device("usb:001:002"))]
    #[case(HardwareError::busy("usb:001:002"))]
    #[case(HardwareError::NotOpen)]
    #[case(HardwareError::target_lost("removed"))]
    #[case(HardwareError::disconnected("usb:001:002"))]
    #[case(HardwareError::communication("crc"))]
    #[case(HardwareError::initialization_failed("no answer"))]
    #[case(HardwareError::Overflow { len: 4, capacity: 2 })]
    fn test_every_failure_is_communication_error(#[case] error: HardwareError) {
        let core: ifdnfc_core::Error = error.into();
        assert_eq!(core.response_code(), ResponseCode::CommunicationError);
    }

    #[test]
    fn test_target_lost_classification() {
        assert!(HardwareError::target_lost("gone").is_target_lost());
        assert!(!HardwareError::NotOpen.is_target_lost());
        assert!(!HardwareError::communication("crc").is_target_lost());
    }
}
