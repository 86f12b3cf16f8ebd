mod error;
mod frame;
mod packet_type;
pub mod packets;
mod utils;

pub use error::ProtocolError;
pub use frame::Frame;
pub use packet_type::PacketType;
pub use packets::{
    build_publish_frame, ConnAckPacket, ConnectFlags, ConnectPacket, ConnectReturnCode, Packet,
    PacketDecoder, PacketEncoder, PacketHeader, PingReqPacket, PingRespPacket, PublishPacket,
    SubAckPacket, SubAckReturnCode, SubscribePacket,
};
pub use utils::{
    decode_remaining_length, encode_remaining_length, put_remaining_length, remaining_length_len,
    RemainingLengthDecoder, MAX_REMAINING_LENGTH, MAX_REMAINING_LENGTH_BYTES,
};
