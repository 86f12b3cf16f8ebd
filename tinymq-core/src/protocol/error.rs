#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Remaining length field did not terminate within 4 bytes
    MalformedRemainingLength,
    /// Packet body ended before a field could be read
    IncompletePacket { needed: usize, available: usize },
    /// String field is not valid UTF-8
    InvalidUtf8String,
    /// String field does not fit a 2-byte length prefix
    StringTooLong { length: usize },
    /// Packet body exceeds the largest encodable remaining length
    PacketTooLarge { size: usize },
}

impl core::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ProtocolError::MalformedRemainingLength => {
                write!(f, "Malformed remaining length: more than 4 bytes")
            }
            ProtocolError::IncompletePacket { needed, available } => {
                write!(
                    f,
                    "Incomplete packet: needed {} bytes, available {}",
                    needed, available
                )
            }
            ProtocolError::InvalidUtf8String => write!(f, "Invalid UTF-8 string"),
            ProtocolError::StringTooLong { length } => {
                write!(f, "String too long for length prefix: {} bytes", length)
            }
            ProtocolError::PacketTooLarge { size } => {
                write!(f, "Packet too large: {} bytes", size)
            }
        }
    }
}

impl core::error::Error for ProtocolError {}
