use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::packets::{PacketDecoder, PacketEncoder, PacketHeader};
use crate::protocol::utils::{put_string, read_string, read_u16, read_u8};
use crate::protocol::{PacketType, ProtocolError};

/// SUBSCRIBE carrying a single topic filter.
///
/// Additional filters in the same packet are not read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribePacket {
    pub packet_id: u16,
    pub topic_filter: String,
    pub requested_qos: u8,
}

impl SubscribePacket {
    pub fn new(packet_id: u16, topic_filter: impl Into<String>) -> Self {
        Self {
            packet_id,
            topic_filter: topic_filter.into(),
            requested_qos: 0,
        }
    }
}

impl PacketHeader for SubscribePacket {
    const PACKET_TYPE: PacketType = PacketType::Subscribe;
    const PACKET_FLAGS: u8 = 0b0010;
}

impl PacketEncoder for SubscribePacket {
    fn encode_body(&self, buffer: &mut BytesMut) -> Result<(), ProtocolError> {
        buffer.put_u16(self.packet_id);
        put_string(&self.topic_filter, buffer)?;
        buffer.put_u8(self.requested_qos);
        Ok(())
    }
}

impl PacketDecoder for SubscribePacket {
    fn decode(body: &Bytes) -> Result<Self, ProtocolError> {
        let mut offset = 0;
        let packet_id = read_u16(body, &mut offset)?;
        let topic_filter = read_string(body, &mut offset)?.to_string();
        let requested_qos = read_u8(body, &mut offset)?;
        Ok(Self {
            packet_id,
            topic_filter,
            requested_qos,
        })
    }
}
