mod connack;
mod connect;
mod ping;
mod publish;
mod suback;
mod subscribe;

pub use connack::{ConnAckPacket, ConnectReturnCode};
pub use connect::{ConnectFlags, ConnectPacket, MQTT_3_1_1_PROTOCOL_LEVEL, MQTT_PROTOCOL_NAME};
pub use ping::{PingReqPacket, PingRespPacket};
pub use publish::{build_publish_frame, PublishPacket};
pub use suback::{SubAckPacket, SubAckReturnCode};
pub use subscribe::SubscribePacket;

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::utils::{put_remaining_length, remaining_length_len};
use crate::protocol::{Frame, PacketType, ProtocolError};

pub trait PacketHeader {
    const PACKET_TYPE: PacketType;
    const PACKET_FLAGS: u8 = 0b0000;

    fn header_first_byte() -> u8 {
        ((Self::PACKET_TYPE as u8) << 4) | (Self::PACKET_FLAGS & 0x0F)
    }
}

pub trait PacketEncoder: PacketHeader {
    /// Write everything after the fixed header
    fn encode_body(&self, buffer: &mut BytesMut) -> Result<(), ProtocolError>;

    /// Encode a complete frame: header byte, remaining length, body
    fn encode(&self) -> Result<Bytes, ProtocolError> {
        let mut body = BytesMut::new();
        self.encode_body(&mut body)?;

        let mut frame = BytesMut::with_capacity(1 + remaining_length_len(body.len()) + body.len());
        frame.put_u8(Self::header_first_byte());
        put_remaining_length(body.len(), &mut frame)?;
        frame.extend_from_slice(&body);
        Ok(frame.freeze())
    }
}

pub trait PacketDecoder: Sized {
    /// Decode from the frame body (fixed header already stripped)
    fn decode(body: &Bytes) -> Result<Self, ProtocolError>;
}

/// Client to server packets the broker acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Connect(ConnectPacket),
    Publish(PublishPacket),
    Subscribe(SubscribePacket),
    PingReq,
    /// Any other packet type, carried only so it can be logged and skipped
    Unsupported(PacketType),
}

impl Packet {
    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        let packet = match frame.packet_type {
            PacketType::Connect => Packet::Connect(ConnectPacket::decode(&frame.body)?),
            PacketType::Publish => Packet::Publish(PublishPacket::decode(&frame.body)?),
            PacketType::Subscribe => Packet::Subscribe(SubscribePacket::decode(&frame.body)?),
            PacketType::PingReq => Packet::PingReq,
            other => Packet::Unsupported(other),
        };
        Ok(packet)
    }

    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::Connect(_) => PacketType::Connect,
            Packet::Publish(_) => PacketType::Publish,
            Packet::Subscribe(_) => PacketType::Subscribe,
            Packet::PingReq => PacketType::PingReq,
            Packet::Unsupported(packet_type) => *packet_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_decode_dispatches_by_type() {
        let frame = Frame::new(0xC0, Bytes::new());
        assert_eq!(Packet::decode(&frame), Ok(Packet::PingReq));

        let frame = Frame::new(0x30, Bytes::from_static(&[0x00, 0x01, b't', b'x']));
        let packet = Packet::decode(&frame).unwrap();
        assert_eq!(packet.packet_type(), PacketType::Publish);
    }

    #[test]
    fn test_packet_decode_keeps_unsupported_types() {
        let frame = Frame::new(0xE0, Bytes::new());
        assert_eq!(
            Packet::decode(&frame),
            Ok(Packet::Unsupported(PacketType::Disconnect))
        );

        let frame = Frame::new(0xA2, Bytes::from_static(&[0x00, 0x01]));
        assert_eq!(
            Packet::decode(&frame),
            Ok(Packet::Unsupported(PacketType::Unsubscribe))
        );
    }
}
