use bytes::Bytes;
use log::trace;
use tinymq_core::protocol::{Frame, RemainingLengthDecoder};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::FrameError;

/// Read one complete frame.
///
/// Waits until the whole body has arrived. End of stream before the first
/// byte is [`FrameError::ConnectionClosed`], anywhere later it is
/// [`FrameError::TruncatedFrame`].
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 1];
    if reader.read(&mut header).await? == 0 {
        return Err(FrameError::ConnectionClosed);
    }

    let remaining_length = read_remaining_length(reader).await?;

    // grows with the bytes that actually arrive, not the declared length
    let mut body = Vec::new();
    let received = reader
        .take(remaining_length as u64)
        .read_to_end(&mut body)
        .await?;
    if received < remaining_length {
        return Err(FrameError::TruncatedFrame {
            expected: Some(remaining_length),
            received,
        });
    }

    trace!(
        "Read frame header=0x{:02X} remaining_length={}",
        header[0],
        remaining_length
    );
    Ok(Frame::new(header[0], Bytes::from(body)))
}

async fn read_remaining_length<R>(reader: &mut R) -> Result<usize, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut decoder = RemainingLengthDecoder::new();
    loop {
        let mut byte = [0u8; 1];
        if reader.read(&mut byte).await? == 0 {
            return Err(FrameError::TruncatedFrame {
                expected: None,
                received: decoder.consumed(),
            });
        }
        if let Some(length) = decoder.feed(byte[0])? {
            return Ok(length);
        }
    }
}
