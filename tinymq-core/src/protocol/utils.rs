use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::ProtocolError;

/// Largest value the 4-byte remaining length field can carry (0x0FFFFFFF)
pub const MAX_REMAINING_LENGTH: usize = 268_435_455;

/// Maximum number of bytes in the remaining length field
pub const MAX_REMAINING_LENGTH_BYTES: usize = 4;

/// Incremental decoder for the base-128 remaining length field.
///
/// Bytes are fed one at a time so the same state machine serves both
/// slice parsing and byte-by-byte reads from a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemainingLengthDecoder {
    value: usize,
    multiplier: usize,
    consumed: usize,
}

impl RemainingLengthDecoder {
    pub const fn new() -> Self {
        Self {
            value: 0,
            multiplier: 1,
            consumed: 0,
        }
    }

    /// Feed the next byte of the field.
    ///
    /// Returns `Ok(Some(length))` once a byte without the continuation bit
    /// has been seen, `Ok(None)` while more bytes are needed.
    pub fn feed(&mut self, byte: u8) -> Result<Option<usize>, ProtocolError> {
        if self.consumed >= MAX_REMAINING_LENGTH_BYTES {
            return Err(ProtocolError::MalformedRemainingLength);
        }
        self.value += (byte & 0x7F) as usize * self.multiplier;
        self.consumed += 1;

        if byte & 0x80 == 0 {
            return Ok(Some(self.value));
        }

        // a continuation bit on the 4th byte would need a 5th
        if self.consumed == MAX_REMAINING_LENGTH_BYTES {
            return Err(ProtocolError::MalformedRemainingLength);
        }
        self.multiplier *= 128;
        Ok(None)
    }

    /// Number of length bytes consumed so far
    pub const fn consumed(&self) -> usize {
        self.consumed
    }
}

impl Default for RemainingLengthDecoder {
    fn default() -> Self {
        Self::new()
    }
}

pub const fn remaining_length_len(value: usize) -> usize {
    if value < 128 {
        1
    } else if value < 16_384 {
        2
    } else if value < 2_097_152 {
        3
    } else {
        4
    }
}

/// Decode a remaining length from the front of `bytes`.
///
/// Returns the decoded value and the number of bytes it occupied.
pub fn decode_remaining_length(bytes: &[u8]) -> Result<(usize, usize), ProtocolError> {
    let mut decoder = RemainingLengthDecoder::new();
    for &byte in bytes {
        if let Some(value) = decoder.feed(byte)? {
            return Ok((value, decoder.consumed()));
        }
    }
    Err(ProtocolError::IncompletePacket {
        needed: decoder.consumed() + 1,
        available: bytes.len(),
    })
}

/// Append the base-128 encoding of `value` to `buffer`
pub fn put_remaining_length(value: usize, buffer: &mut BytesMut) -> Result<usize, ProtocolError> {
    if value > MAX_REMAINING_LENGTH {
        return Err(ProtocolError::PacketTooLarge { size: value });
    }

    let mut encoded = value;
    let mut bytes_written = 0;
    loop {
        let mut byte = (encoded & 0x7F) as u8;
        encoded >>= 7;
        if encoded > 0 {
            byte |= 0x80;
        }
        buffer.put_u8(byte);
        bytes_written += 1;
        if encoded == 0 {
            break;
        }
    }
    Ok(bytes_written)
}

pub fn encode_remaining_length(value: usize) -> Result<Bytes, ProtocolError> {
    let mut buffer = BytesMut::with_capacity(remaining_length_len(value));
    put_remaining_length(value, &mut buffer)?;
    Ok(buffer.freeze())
}

pub fn read_u16(bytes: &[u8], offset: &mut usize) -> Result<u16, ProtocolError> {
    if *offset + 2 > bytes.len() {
        return Err(ProtocolError::IncompletePacket {
            needed: *offset + 2,
            available: bytes.len(),
        });
    }
    let value = u16::from_be_bytes([bytes[*offset], bytes[*offset + 1]]);
    *offset += 2;
    Ok(value)
}

pub fn read_u8(bytes: &[u8], offset: &mut usize) -> Result<u8, ProtocolError> {
    let value = *bytes.get(*offset).ok_or(ProtocolError::IncompletePacket {
        needed: *offset + 1,
        available: bytes.len(),
    })?;
    *offset += 1;
    Ok(value)
}

/// Read a 2-byte length prefixed byte field
pub fn read_binary<'a>(bytes: &'a [u8], offset: &mut usize) -> Result<&'a [u8], ProtocolError> {
    let len = read_u16(bytes, offset)? as usize;
    if *offset + len > bytes.len() {
        return Err(ProtocolError::IncompletePacket {
            needed: *offset + len,
            available: bytes.len(),
        });
    }
    let field = &bytes[*offset..*offset + len];
    *offset += len;
    Ok(field)
}

/// Read a 2-byte length prefixed UTF-8 string
pub fn read_string<'a>(bytes: &'a [u8], offset: &mut usize) -> Result<&'a str, ProtocolError> {
    let field = read_binary(bytes, offset)?;
    core::str::from_utf8(field).map_err(|_| ProtocolError::InvalidUtf8String)
}

pub fn put_binary(field: &[u8], buffer: &mut BytesMut) -> Result<(), ProtocolError> {
    let len = u16::try_from(field.len())
        .map_err(|_| ProtocolError::StringTooLong { length: field.len() })?;
    buffer.put_u16(len);
    buffer.put_slice(field);
    Ok(())
}

pub fn put_string(s: &str, buffer: &mut BytesMut) -> Result<(), ProtocolError> {
    put_binary(s.as_bytes(), buffer)
}
