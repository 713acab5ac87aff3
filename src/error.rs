//! Error types for the broute library.

use thiserror::Error;

use crate::join::JoinStep;

/// The main error type for broute operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Serial port error.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Notification frame did not carry a power reading.
    #[error("no reading in frame: {0}")]
    Decode(#[from] DecodeError),

    /// Reply did not follow the expected grammar.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Adapter rejected the command with a `FAIL` reply.
    #[error("device rejected {command}: FAIL {code}")]
    Device { command: String, code: String },

    /// No reply arrived before the deadline.
    #[error("command timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Connection is not established.
    #[error("not connected")]
    NotConnected,

    /// Network has not been joined yet.
    #[error("not commissioned")]
    NotCommissioned,

    /// Active scan finished without a complete PAN description.
    #[error("scan incomplete: missing {}", missing.join(", "))]
    ScanIncomplete { missing: Vec<&'static str> },

    /// PANA authentication reported failure.
    #[error("join failed: {event}")]
    JoinFailed { event: String },

    /// Data request produced no `ERXUDP` line.
    #[error("notification not found, collected: {collected:?}")]
    NotificationNotFound { collected: Vec<String> },

    /// A commissioning step failed.
    #[error("commissioning failed at {step}: {source}")]
    Commissioning {
        step: JoinStep,
        #[source]
        source: Box<Error>,
    },

    /// Metric sink failed to deliver a value.
    #[error("metric sink error: {message}")]
    Sink { message: String },
}

impl Error {
    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a timeout error from a duration.
    #[must_use]
    pub fn timeout(elapsed: std::time::Duration) -> Self {
        Self::Timeout {
            timeout_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Returns true if this is a routine frame mismatch.
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }

    /// Returns true if this error came from a deadline expiring.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns the failed commissioning step, if any.
    #[must_use]
    pub const fn failed_step(&self) -> Option<JoinStep> {
        match self {
            Self::Commissioning { step, .. } => Some(*step),
            _ => None,
        }
    }
}

/// Frame-specific errors.
///
/// The adapter forwards every datagram it receives, so most of these are
/// expected during normal polling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Notification line has too few fields.
    #[error("missing payload field: line has {0} fields")]
    MissingPayload(usize),

    /// Payload field is not valid hex.
    #[error("payload is not hex: {0}")]
    InvalidHex(String),

    /// Frame too short to contain a property value.
    #[error("frame too short: need at least {min} bytes, got {got}")]
    TooShort { min: usize, got: usize },

    /// Frame came from another object class.
    #[error("unexpected source object {0:06X}")]
    UnexpectedObject(u32),

    /// Frame is not a Get response.
    #[error("unexpected service {0:02X}")]
    UnexpectedService(u8),

    /// Frame carries another property.
    #[error("unexpected property {0:02X}")]
    UnexpectedProperty(u8),
}

/// Result type alias for broute operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_incomplete_lists_missing_labels() {
        let err = Error::ScanIncomplete {
            missing: vec!["Pan ID", "LQI"],
        };
        assert_eq!(err.to_string(), "scan incomplete: missing Pan ID, LQI");
    }

    #[test]
    fn test_commissioning_reports_step() {
        let err = Error::Commissioning {
            step: JoinStep::Scan,
            source: Box::new(Error::timeout(std::time::Duration::from_secs(60))),
        };
        assert_eq!(err.failed_step(), Some(JoinStep::Scan));
        assert!(err.to_string().contains("scan"));
        assert!(err.to_string().contains("60000ms"));
    }

    #[test]
    fn test_classification() {
        assert!(Error::Decode(DecodeError::UnexpectedService(0x71)).is_decode());
        assert!(Error::timeout(std::time::Duration::from_millis(5)).is_timeout());
        assert!(!Error::NotConnected.is_timeout());
    }
}
