use bytes::{BufMut, BytesMut};

use crate::protocol::packets::{PacketEncoder, PacketHeader};
use crate::protocol::{PacketType, ProtocolError};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectReturnCode {
    Accepted = 0,
    UnacceptableProtocolVersion = 1,
    IdentifierRejected = 2,
    ServerUnavailable = 3,
    BadUserNameOrPassword = 4,
    NotAuthorized = 5,
}

impl ConnectReturnCode {
    pub const fn is_accepted(self) -> bool {
        matches!(self, ConnectReturnCode::Accepted)
    }
}

impl core::fmt::Display for ConnectReturnCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            ConnectReturnCode::Accepted => "accepted",
            ConnectReturnCode::UnacceptableProtocolVersion => "unacceptable protocol version",
            ConnectReturnCode::IdentifierRejected => "identifier rejected",
            ConnectReturnCode::ServerUnavailable => "server unavailable",
            ConnectReturnCode::BadUserNameOrPassword => "bad user name or password",
            ConnectReturnCode::NotAuthorized => "not authorized",
        };
        write!(f, "{} (0x{:02X})", text, *self as u8)
    }
}

/// `0x20 0x02 0x00 <return code>`; the acknowledge flags byte is always 0
/// since sessions are never resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnAckPacket {
    pub return_code: ConnectReturnCode,
}

impl ConnAckPacket {
    pub const fn new(return_code: ConnectReturnCode) -> Self {
        Self { return_code }
    }
}

impl PacketHeader for ConnAckPacket {
    const PACKET_TYPE: PacketType = PacketType::ConnAck;
}

impl PacketEncoder for ConnAckPacket {
    fn encode_body(&self, buffer: &mut BytesMut) -> Result<(), ProtocolError> {
        buffer.put_u8(0b0000_0000);
        buffer.put_u8(self.return_code as u8);
        Ok(())
    }
}
