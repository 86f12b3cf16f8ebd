//! Error types for connection handling

use tinymq_core::ProtocolError;

/// Failure to read one frame from a connection
#[derive(Debug)]
pub enum FrameError {
    /// Stream ended before the first byte of a frame
    ConnectionClosed,
    /// Stream ended inside a frame. `expected` is `None` when it ended
    /// inside the remaining length field.
    TruncatedFrame {
        expected: Option<usize>,
        received: usize,
    },
    /// Remaining length needed a 5th byte
    Malformed(ProtocolError),
    Io(std::io::Error),
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FrameError::ConnectionClosed => write!(f, "Connection closed by peer"),
            FrameError::TruncatedFrame {
                expected: Some(expected),
                received,
            } => {
                write!(
                    f,
                    "Truncated frame: received {} of {} bytes",
                    received, expected
                )
            }
            FrameError::TruncatedFrame {
                expected: None,
                received,
            } => {
                write!(
                    f,
                    "Truncated frame: stream ended after {} remaining length bytes",
                    received
                )
            }
            FrameError::Malformed(error) => write!(f, "Malformed frame: {}", error),
            FrameError::Io(error) => write!(f, "I/O error: {}", error),
        }
    }
}

impl core::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            FrameError::Malformed(error) => Some(error),
            FrameError::Io(error) => Some(error),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FrameError {
    fn from(error: std::io::Error) -> Self {
        FrameError::Io(error)
    }
}

impl From<ProtocolError> for FrameError {
    fn from(error: ProtocolError) -> Self {
        FrameError::Malformed(error)
    }
}

/// Reason a connection handler stopped
#[derive(Debug)]
pub enum BrokerError {
    Frame(FrameError),
    /// Frame body could not be parsed, or an outbound frame could not be built
    Protocol(ProtocolError),
    /// Write to the connection's own socket failed
    Io(std::io::Error),
    /// Packet not allowed in the current connection state
    ProtocolViolation { reason: &'static str },
}

impl core::fmt::Display for BrokerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BrokerError::Frame(error) => write!(f, "{}", error),
            BrokerError::Protocol(error) => write!(f, "Protocol error: {}", error),
            BrokerError::Io(error) => write!(f, "I/O error: {}", error),
            BrokerError::ProtocolViolation { reason } => {
                write!(f, "Protocol violation: {}", reason)
            }
        }
    }
}

impl core::error::Error for BrokerError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            BrokerError::Frame(error) => Some(error),
            BrokerError::Protocol(error) => Some(error),
            BrokerError::Io(error) => Some(error),
            BrokerError::ProtocolViolation { .. } => None,
        }
    }
}

impl From<FrameError> for BrokerError {
    fn from(error: FrameError) -> Self {
        BrokerError::Frame(error)
    }
}

impl From<ProtocolError> for BrokerError {
    fn from(error: ProtocolError) -> Self {
        BrokerError::Protocol(error)
    }
}

impl From<std::io::Error> for BrokerError {
    fn from(error: std::io::Error) -> Self {
        BrokerError::Io(error)
    }
}
