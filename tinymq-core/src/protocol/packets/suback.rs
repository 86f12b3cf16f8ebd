use bytes::{BufMut, BytesMut};

use crate::protocol::packets::{PacketEncoder, PacketHeader};
use crate::protocol::{PacketType, ProtocolError};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubAckReturnCode {
    /// Subscription accepted at QoS 0, the only level granted
    GrantedQos0 = 0x00,
    Failure = 0x80,
}

/// `0x90 0x03 <packet id> <return code>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubAckPacket {
    pub packet_id: u16,
    pub return_code: SubAckReturnCode,
}

impl SubAckPacket {
    pub const fn new(packet_id: u16, return_code: SubAckReturnCode) -> Self {
        Self {
            packet_id,
            return_code,
        }
    }
}

impl PacketHeader for SubAckPacket {
    const PACKET_TYPE: PacketType = PacketType::SubAck;
}

impl PacketEncoder for SubAckPacket {
    fn encode_body(&self, buffer: &mut BytesMut) -> Result<(), ProtocolError> {
        buffer.put_u16(self.packet_id);
        buffer.put_u8(self.return_code as u8);
        Ok(())
    }
}
