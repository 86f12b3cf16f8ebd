use bytes::Bytes;

use crate::protocol::PacketType;

/// One complete packet as read off the wire: fixed header nibbles plus
/// exactly `remaining length` body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub packet_type: PacketType,
    pub flags: u8,
    pub body: Bytes,
}

impl Frame {
    pub fn new(header: u8, body: Bytes) -> Self {
        Self {
            packet_type: PacketType::from_header(header),
            flags: header & 0x0F,
            body,
        }
    }

    /// Reassembled fixed header byte
    pub fn header(&self) -> u8 {
        ((self.packet_type as u8) << 4) | self.flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_splits_header_nibbles() {
        let frame = Frame::new(0x82, Bytes::from_static(&[0x00, 0x01]));
        assert_eq!(frame.packet_type, PacketType::Subscribe);
        assert_eq!(frame.flags, 0x02);
        assert_eq!(frame.header(), 0x82);
    }
}
