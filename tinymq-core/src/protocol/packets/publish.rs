use bytes::{Bytes, BytesMut};

use crate::protocol::packets::{PacketDecoder, PacketEncoder, PacketHeader};
use crate::protocol::utils::{put_string, read_string};
use crate::protocol::{PacketType, ProtocolError};

/// QoS 0 PUBLISH: topic name followed by the raw payload, no packet identifier.
///
/// The QoS, DUP and RETAIN flag bits of inbound frames are ignored and
/// outbound frames always carry `0000`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPacket {
    pub topic: String,
    pub payload: Bytes,
}

impl PublishPacket {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

impl PacketHeader for PublishPacket {
    const PACKET_TYPE: PacketType = PacketType::Publish;
}

impl PacketEncoder for PublishPacket {
    fn encode_body(&self, buffer: &mut BytesMut) -> Result<(), ProtocolError> {
        put_string(&self.topic, buffer)?;
        buffer.extend_from_slice(&self.payload);
        Ok(())
    }
}

impl PacketDecoder for PublishPacket {
    fn decode(body: &Bytes) -> Result<Self, ProtocolError> {
        let mut offset = 0;
        let topic = read_string(body, &mut offset)?.to_string();
        Ok(Self {
            topic,
            payload: body.slice(offset..),
        })
    }
}

/// Build the frame forwarded to subscribers of `topic`
pub fn build_publish_frame(topic: &str, payload: &[u8]) -> Result<Bytes, ProtocolError> {
    PublishPacket::new(topic, Bytes::copy_from_slice(payload)).encode()
}
