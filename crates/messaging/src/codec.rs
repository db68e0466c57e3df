//! Length-prefixed JSON framing, symmetric for requests and responses:
//! a 4-byte unsigned little-endian length, then that many bytes of UTF-8
//! JSON.

use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single frame; matches the browser-side limit for
/// messages sent to an extension.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame length truncated after {got} of 4 bytes")]
    TruncatedLength { got: usize },
    #[error("frame payload truncated, expected {expected} bytes")]
    TruncatedPayload {
        expected: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("frame of {len} bytes exceeds the frame size limit")]
    Oversized { len: usize },
    #[error("frame payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Read one frame. `Ok(None)` means the peer closed the stream cleanly
/// before a new frame began; a partial length prefix or payload is an
/// error.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<serde_json::Value>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        let n = reader.read(&mut len_buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(ProtocolError::TruncatedLength { got: filled });
        }
        filled += n;
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::Oversized { len });
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|source| ProtocolError::TruncatedPayload {
            expected: len,
            source,
        })?;

    Ok(Some(serde_json::from_slice(&payload)?))
}

/// Serialize `value` and write it as one frame, flushing afterwards.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = serde_json::to_vec(value)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::Oversized { len: payload.len() });
    }

    let len = payload.len() as u32;
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}
