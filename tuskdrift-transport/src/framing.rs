//! Length-prefixed framing — `uint32_be length || payload` (spec.md §4.7),
//! grounded directly on `StdioTransport::read_frame`/`write_frame`,
//! adapted from tokio stdio to any `AsyncRead`/`AsyncWrite` duplex.

use crate::error::{Result, TransportError};
use crate::message::TransportMessage;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len == 0 {
        return Err(TransportError::InvalidFrameLength(len));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    if payload.is_empty() {
        return Err(TransportError::InvalidFrameLength(0));
    }
    let len = (payload.len() as u32).to_be_bytes();
    writer.write_all(&len).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<TransportMessage> {
    let payload = read_frame(reader).await?;
    let message = bincode::deserialize(&payload)?;
    Ok(message)
}

pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &TransportMessage,
) -> Result<()> {
    let payload = bincode::serialize(message)?;
    write_frame(writer, &payload).await
}

/// Slice complete frames out of a rolling buffer (spec.md §4.7: "while
/// `buffer.len >= 4` and `buffer.len >= 4 + messageLen`, slice one frame
/// and dispatch; otherwise wait for more data"). Used by transports that
/// receive bytes in arbitrary chunks rather than owning the socket read
/// loop directly (e.g. a buffered/test transport).
pub fn drain_frames(buf: &mut bytes::BytesMut) -> Vec<bytes::Bytes> {
    let mut frames = Vec::new();
    loop {
        if buf.len() < 4 {
            break;
        }
        let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        if buf.len() < 4 + len {
            break;
        }
        let _ = buf.split_to(4);
        frames.push(buf.split_to(len).freeze());
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_message_through_a_duplex_pipe() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let message = TransportMessage::SdkConnect {
            request_id: "r1".into(),
            service_id: "svc".into(),
            sdk_version: "0.1.0".into(),
            min_cli_version: "0.1.0".into(),
        };
        write_message(&mut client, &message).await.unwrap();
        let received = read_message(&mut server).await.unwrap();
        assert_eq!(received.request_id(), "r1");
    }

    #[test]
    fn drain_frames_splits_exactly_complete_frames() {
        let mut buf = bytes::BytesMut::new();
        buf.extend_from_slice(&3u32.to_be_bytes());
        buf.extend_from_slice(b"abc");
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(b"de");
        // partial third frame
        buf.extend_from_slice(&10u32.to_be_bytes());
        buf.extend_from_slice(b"partial");

        let frames = drain_frames(&mut buf);
        assert_eq!(frames.len(), 2);
        assert_eq!(&frames[0][..], b"abc");
        assert_eq!(&frames[1][..], b"de");
        assert_eq!(buf.len(), 4 + 7);
    }

    #[test]
    fn drain_frames_on_arbitrary_split_yields_same_message_count() {
        let mut full = bytes::BytesMut::new();
        for payload in [&b"one"[..], &b"two"[..], &b"three"[..]] {
            full.extend_from_slice(&(payload.len() as u32).to_be_bytes());
            full.extend_from_slice(payload);
        }
        let bytes_vec = full.to_vec();

        for split_at in 0..bytes_vec.len() {
            let mut buf = bytes::BytesMut::new();
            let mut total = 0;
            buf.extend_from_slice(&bytes_vec[..split_at]);
            total += drain_frames(&mut buf).len();
            buf.extend_from_slice(&bytes_vec[split_at..]);
            total += drain_frames(&mut buf).len();
            assert_eq!(total, 3, "split at {split_at} produced wrong frame count");
        }
    }
}
