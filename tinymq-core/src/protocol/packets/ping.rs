use bytes::BytesMut;

use crate::protocol::packets::{PacketEncoder, PacketHeader};
use crate::protocol::{PacketType, ProtocolError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PingReqPacket;

impl PacketHeader for PingReqPacket {
    const PACKET_TYPE: PacketType = PacketType::PingReq;
}

impl PacketEncoder for PingReqPacket {
    fn encode_body(&self, _buffer: &mut BytesMut) -> Result<(), ProtocolError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PingRespPacket;

impl PingRespPacket {
    /// The complete PINGRESP frame
    pub const FRAME: [u8; 2] = [0xD0, 0x00];
}

impl PacketHeader for PingRespPacket {
    const PACKET_TYPE: PacketType = PacketType::PingResp;
}

impl PacketEncoder for PingRespPacket {
    fn encode_body(&self, _buffer: &mut BytesMut) -> Result<(), ProtocolError> {
        Ok(())
    }
}
