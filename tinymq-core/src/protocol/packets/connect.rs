use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::packets::{PacketDecoder, PacketEncoder, PacketHeader};
use crate::protocol::utils::{put_binary, put_string, read_binary, read_string, read_u16, read_u8};
use crate::protocol::{PacketType, ProtocolError};

pub const MQTT_PROTOCOL_NAME: &str = "MQTT";
pub const MQTT_3_1_1_PROTOCOL_LEVEL: u8 = 4; // MQTT 3.1.1

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ConnectFlags(u8);

impl ConnectFlags {
    pub const CLEAN_SESSION: Self = Self(0b_0000_0010);
    pub const WILL_FLAG: Self = Self(0b_0000_0100);
    pub const PASSWORD: Self = Self(0b_0100_0000);
    pub const USERNAME: Self = Self(0b_1000_0000);

    pub const fn from_bits(bits: u8) -> Self { Self(bits) }
    pub const fn bits(self) -> u8 { self.0 }
    pub const fn contains(self, other: Self) -> bool { (self.0 & other.0) == other.0 }
    pub fn insert(&mut self, other: Self) { self.0 |= other.0; }
}

/// Fixed Header
///   byte 1:  0x10                      (type=1, flags=0000)
///   bytes :  Remaining Length (var-int)
///
/// Variable Header
///   Protocol Name      (UTF-8 string, not validated)
///   Protocol Level     (0x04 for MQTT 3.1.1)
///   Connect Flags      (bitfield)
///   Keep Alive         (2 bytes)
///
/// Payload (order matters, some fields optional)
///   Client Identifier  (UTF-8 string)
///   Will Topic         (UTF-8 string)   [if Will Flag = 1, skipped]
///   Will Payload       (binary data)    [if Will Flag = 1, skipped]
///   User Name          (UTF-8 string)   [if User Name Flag = 1]
///   Password           (binary data)    [if Password Flag = 1]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectPacket {
    pub protocol_name: String,
    pub protocol_level: u8,
    pub connect_flags: ConnectFlags,
    pub keep_alive: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<Bytes>,
}

impl ConnectPacket {
    /// A clean-session MQTT 3.1.1 CONNECT with no credentials
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            protocol_name: MQTT_PROTOCOL_NAME.to_string(),
            protocol_level: MQTT_3_1_1_PROTOCOL_LEVEL,
            connect_flags: ConnectFlags::CLEAN_SESSION,
            keep_alive: 60,
            client_id: client_id.into(),
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<Bytes>,
    ) -> Self {
        self.connect_flags.insert(ConnectFlags::USERNAME);
        self.connect_flags.insert(ConnectFlags::PASSWORD);
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

impl PacketHeader for ConnectPacket {
    const PACKET_TYPE: PacketType = PacketType::Connect;
}

impl PacketEncoder for ConnectPacket {
    fn encode_body(&self, buffer: &mut BytesMut) -> Result<(), ProtocolError> {
        // variable header
        put_string(&self.protocol_name, buffer)?;
        buffer.put_u8(self.protocol_level);
        buffer.put_u8(self.connect_flags.bits());
        buffer.put_u16(self.keep_alive);

        // payload, written as declared by the flags
        put_string(&self.client_id, buffer)?;
        if let Some(username) = &self.username {
            put_string(username, buffer)?;
        }
        if let Some(password) = &self.password {
            put_binary(password, buffer)?;
        }
        Ok(())
    }
}

impl PacketDecoder for ConnectPacket {
    fn decode(body: &Bytes) -> Result<Self, ProtocolError> {
        let mut offset = 0;

        // variable header
        let protocol_name = read_string(body, &mut offset)?.to_string();
        let protocol_level = read_u8(body, &mut offset)?;
        let connect_flags = ConnectFlags::from_bits(read_u8(body, &mut offset)?);
        let keep_alive = read_u16(body, &mut offset)?;

        // payload
        let client_id = read_string(body, &mut offset)?.to_string();
        if connect_flags.contains(ConnectFlags::WILL_FLAG) {
            // will topic and will message, not delivered by this broker
            read_string(body, &mut offset)?;
            read_binary(body, &mut offset)?;
        }
        let username = if connect_flags.contains(ConnectFlags::USERNAME) {
            Some(read_string(body, &mut offset)?.to_string())
        } else {
            None
        };
        let password = if connect_flags.contains(ConnectFlags::PASSWORD) {
            let field = read_binary(body, &mut offset)?;
            Some(body.slice_ref(field))
        } else {
            None
        };

        Ok(Self {
            protocol_name,
            protocol_level,
            connect_flags,
            keep_alive,
            client_id,
            username,
            password,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_test(body: &[u8]) -> Result<ConnectPacket, ProtocolError> {
        ConnectPacket::decode(&Bytes::copy_from_slice(body))
    }

    #[test]
    fn test_decode_anonymous_connect() {
        let body = [
            0x00, 0x04, b'M', b'Q', b'T', b'T', // protocol name
            0x04, // level
            0x02, // flags: clean session
            0x00, 0x3C, // keep alive 60
            0x00, 0x03, b's', b'u', b'b', // client id
        ];
        let packet = decode_test(&body).unwrap();
        assert_eq!(packet.protocol_name, "MQTT");
        assert_eq!(packet.protocol_level, 4);
        assert_eq!(packet.keep_alive, 60);
        assert_eq!(packet.client_id, "sub");
        assert_eq!(packet.username, None);
        assert_eq!(packet.password, None);
    }

    #[test]
    fn test_decode_connect_with_credentials() {
        let body = [
            0x00, 0x04, b'M', b'Q', b'T', b'T', 0x04, 0xC2, 0x00, 0x0A, // header
            0x00, 0x01, b'c', // client id
            0x00, 0x05, b'a', b'd', b'm', b'i', b'n', // username
            0x00, 0x03, b'p', b'w', 0x00, // password with embedded zero
        ];
        let packet = decode_test(&body).unwrap();
        assert_eq!(packet.username.as_deref(), Some("admin"));
        assert_eq!(packet.password.as_deref(), Some(&b"pw\0"[..]));
    }

    #[test]
    fn test_decode_connect_skips_will_fields() {
        let body = [
            0x00, 0x04, b'M', b'Q', b'T', b'T', 0x04, 0x86, 0x00, 0x00, // will + username
            0x00, 0x01, b'c', // client id
            0x00, 0x01, b'w', // will topic
            0x00, 0x02, 0xDE, 0xAD, // will message
            0x00, 0x02, b'u', b'1', // username
        ];
        let packet = decode_test(&body).unwrap();
        assert_eq!(packet.username.as_deref(), Some("u1"));
        assert_eq!(packet.password, None);
    }

    #[test]
    fn test_decode_username_flag_without_username_bytes() {
        let body = [
            0x00, 0x04, b'M', b'Q', b'T', b'T', 0x04, 0x80, 0x00, 0x3C, // username flag
            0x00, 0x01, b'c', // client id, nothing after
        ];
        assert_eq!(
            decode_test(&body),
            Err(ProtocolError::IncompletePacket {
                needed: 15,
                available: 13
            })
        );
    }

    #[test]
    fn test_decode_empty_body() {
        assert!(matches!(
            decode_test(&[]),
            Err(ProtocolError::IncompletePacket { .. })
        ));
    }

    #[test]
    fn test_encode_decode_with_credentials() {
        let packet = ConnectPacket::new("pub").with_credentials("admin", &b"secret"[..]);
        let frame = packet.encode().unwrap();
        assert_eq!(frame[0], 0x10);
        assert_eq!(frame[1] as usize, frame.len() - 2);
        let decoded = ConnectPacket::decode(&frame.slice(2..)).unwrap();
        assert_eq!(decoded, packet);
        assert!(decoded.connect_flags.contains(ConnectFlags::USERNAME));
        assert!(decoded.connect_flags.contains(ConnectFlags::PASSWORD));
    }
}
