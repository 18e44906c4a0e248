//! WebSocket text-frame codec
//!
//! Reads and writes single unfragmented RFC 6455 text frames over a raw
//! byte stream. Anything else on the wire - control frames, binary
//! frames, fragmentation, 64-bit lengths - is rejected as a protocol
//! error and aborts only the offending connection.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::constants::MAX_FRAME_PAYLOAD;
use crate::error::{RelayError, Result};

const OPCODE_TEXT: u8 = 0x1;
const FIN_BIT: u8 = 0x80;
const MASK_BIT: u8 = 0x80;
const LEN16_MARKER: u8 = 126;
const LEN64_MARKER: u8 = 127;

/// Read one text frame and return its payload.
///
/// Client frames are unmasked in place with the 4-byte key cycling over
/// the payload, as the protocol requires for client-to-server traffic.
pub async fn read_frame<R>(stream: &mut R) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let b0 = stream.read_u8().await?;
    let fin = b0 & FIN_BIT != 0;
    let opcode = b0 & 0x0F;
    if opcode != OPCODE_TEXT {
        return Err(RelayError::Protocol(format!(
            "unsupported opcode {:#x}, only text frames are handled",
            opcode
        )));
    }
    if !fin {
        return Err(RelayError::Protocol(
            "fragmented messages are not supported".to_string(),
        ));
    }

    let b1 = stream.read_u8().await?;
    let masked = b1 & MASK_BIT != 0;
    let len7 = b1 & 0x7F;
    let len = match len7 {
        LEN16_MARKER => stream.read_u16().await? as usize,
        LEN64_MARKER => {
            // 64-bit lengths are rejected before the 8 length bytes are read
            return Err(RelayError::Protocol(
                "oversized message: 64-bit frame lengths are not supported".to_string(),
            ));
        }
        inline => inline as usize,
    };

    let mut key = [0u8; 4];
    if masked {
        stream.read_exact(&mut key).await?;
    }

    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await?;

    if masked {
        for (i, byte) in payload.iter_mut().enumerate() {
            *byte ^= key[i % 4];
        }
    }

    String::from_utf8(payload)
        .map_err(|_| RelayError::Protocol("frame payload is not valid UTF-8".to_string()))
}

/// Write `text` as one unmasked text frame (header and payload flushed
/// as a unit). Server frames are never masked, per protocol.
pub async fn write_frame<W>(stream: &mut W, text: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let payload = text.as_bytes();

    let mut frame = Vec::with_capacity(payload.len() + 4);
    frame.push(FIN_BIT | OPCODE_TEXT); // 0x81
    if payload.len() <= 125 {
        frame.push(payload.len() as u8);
    } else if payload.len() <= MAX_FRAME_PAYLOAD {
        frame.push(LEN16_MARKER);
        frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    } else {
        return Err(RelayError::Protocol(format!(
            "message too large: {} bytes",
            payload.len()
        )));
    }
    frame.extend_from_slice(payload);

    stream.write_all(&frame).await?;
    stream.flush().await?;
    Ok(())
}
