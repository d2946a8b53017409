//! Packet framing over async byte streams.
//!
//! Frames use the same layout as [`encode_frame`](crate::packet::encode_frame):
//!
//! ```text
//! +-----------+----------------------+--------------------+
//! | tag (u8)  | payload len (u32 BE) |   payload          |
//! +-----------+----------------------+--------------------+
//! ```
//!
//! The length does **not** include the 5 header bytes. A payload that decodes
//! to fewer bytes than declared is a protocol violation; the stream cannot be
//! resynchronized after one.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use tessera_wire::WireError;

use crate::packet::{FRAME_HEADER_LEN, Packet, PacketTag, decode_payload, encode_frame};

/// Configuration for the framing layer.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum allowed payload size in bytes. Default: 1 MB.
    pub max_payload_size: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: 1_048_576,
        }
    }
}

/// Errors that can occur during framing operations.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload size exceeds the configured maximum.
    #[error("payload size {size} exceeds maximum {max}")]
    PayloadTooLarge {
        /// The actual payload size.
        size: u32,
        /// The configured maximum.
        max: u32,
    },

    /// The connection was closed before a complete frame was received.
    #[error("connection closed")]
    ConnectionClosed,

    /// The frame arrived intact but its payload is malformed.
    #[error("malformed frame: {0}")]
    Wire(#[from] WireError),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read a single frame from the stream and decode its packet.
///
/// Returns [`FrameError::ConnectionClosed`] if the peer closes the connection
/// before the frame is complete.
pub async fn read_frame<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    config: &FrameConfig,
) -> Result<Packet, FrameError> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    reader.read_exact(&mut header).await.map_err(closed_or_io)?;

    let tag = PacketTag(header[0]);
    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);

    if payload_len > config.max_payload_size {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: config.max_payload_size,
        });
    }

    let mut payload = vec![0u8; payload_len as usize];
    if payload_len > 0 {
        reader.read_exact(&mut payload).await.map_err(closed_or_io)?;
    }

    Ok(decode_payload(tag, &payload)?)
}

/// Encode `packet` and write it to the stream as a single frame.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    packet: &Packet,
    config: &FrameConfig,
) -> Result<(), FrameError> {
    let len = packet.num_bytes() as u32;
    if len > config.max_payload_size {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: config.max_payload_size,
        });
    }

    let frame = encode_frame(packet)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;

    Ok(())
}

fn closed_or_io(e: std::io::Error) -> FrameError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        FrameError::ConnectionClosed
    } else {
        FrameError::Io(e)
    }
}
