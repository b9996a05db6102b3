//! WebSocket frame codec (RFC 6455 sections 5.2-5.3).

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Cap on a single frame's payload, against malicious 64-bit lengths.
const MAX_PAYLOAD_LEN: u64 = 16 * 1024 * 1024;

/// Frame decode failures. I/O errors are kept separate from protocol
/// violations so the frame loop can tell a dead peer from a bad one.
#[derive(Debug)]
pub enum FrameError {
    Io(std::io::Error),
    /// Reserved or unknown opcode value
    UnknownOpcode(u8),
    /// RSV bits set without a negotiated extension
    ReservedBits,
    /// Payload length over [`MAX_PAYLOAD_LEN`] or with the 64-bit MSB set
    PayloadTooLarge(u64),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "frame I/O error: {e}"),
            Self::UnknownOpcode(b) => write!(f, "unknown opcode: 0x{b:X}"),
            Self::ReservedBits => write!(f, "non-zero RSV bits without negotiated extensions"),
            Self::PayloadTooLarge(len) => write!(f, "payload length {len} not accepted"),
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FrameError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Frame opcodes per RFC 6455 section 5.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xA,
}

impl Opcode {
    fn from_u8(byte: u8) -> Result<Self, FrameError> {
        match byte {
            0x0 => Ok(Opcode::Continuation),
            0x1 => Ok(Opcode::Text),
            0x2 => Ok(Opcode::Binary),
            0x8 => Ok(Opcode::Close),
            0x9 => Ok(Opcode::Ping),
            0xA => Ok(Opcode::Pong),
            other => Err(FrameError::UnknownOpcode(other)),
        }
    }
}

/// One decoded frame, payload already unmasked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment of its message
    pub fin: bool,
    pub opcode: Opcode,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn text(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            fin: true,
            opcode: Opcode::Text,
            payload: payload.into(),
        }
    }

    pub fn close() -> Self {
        Self {
            fin: true,
            opcode: Opcode::Close,
            payload: Vec::new(),
        }
    }
}

/// XOR-(un)masks a payload with the 4-byte key. Symmetric: applying it
/// twice restores the original bytes.
pub fn apply_mask(payload: &mut [u8], key: &[u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

/// Reads one frame, handling all three payload length encodings and
/// unmasking client frames.
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame, FrameError>
where
    R: AsyncRead + Unpin,
{
    // Byte 0: FIN(1) RSV(3) opcode(4); byte 1: MASK(1) length(7)
    let mut header = [0u8; 2];
    reader.read_exact(&mut header).await?;

    let fin = header[0] & 0x80 != 0;
    if header[0] & 0x70 != 0 {
        return Err(FrameError::ReservedBits);
    }
    let opcode = Opcode::from_u8(header[0] & 0x0F)?;

    let masked = header[1] & 0x80 != 0;
    let payload_len = match header[1] & 0x7F {
        len @ 0..=125 => u64::from(len),
        126 => {
            let mut buf = [0u8; 2];
            reader.read_exact(&mut buf).await?;
            u64::from(u16::from_be_bytes(buf))
        }
        _ => {
            let mut buf = [0u8; 8];
            reader.read_exact(&mut buf).await?;
            let len = u64::from_be_bytes(buf);
            if len >> 63 != 0 {
                return Err(FrameError::PayloadTooLarge(len));
            }
            len
        }
    };

    if payload_len > MAX_PAYLOAD_LEN {
        return Err(FrameError::PayloadTooLarge(payload_len));
    }

    let mask_key = if masked {
        let mut key = [0u8; 4];
        reader.read_exact(&mut key).await?;
        Some(key)
    } else {
        None
    };

    let mut payload = vec![0u8; payload_len as usize];
    if payload_len > 0 {
        reader.read_exact(&mut payload).await?;
    }

    if let Some(key) = mask_key {
        apply_mask(&mut payload, &key);
    }

    Ok(Frame {
        fin,
        opcode,
        payload,
    })
}

/// Writes one frame unmasked. Server-originated frames must not be masked
/// (RFC 6455 section 5.1), and this codec only writes the server side.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let byte0 = if frame.fin { 0x80 } else { 0x00 } | frame.opcode as u8;

    let len = frame.payload.len();
    if len <= 125 {
        writer.write_all(&[byte0, len as u8]).await?;
    } else if len <= usize::from(u16::MAX) {
        writer.write_all(&[byte0, 126]).await?;
        writer.write_all(&(len as u16).to_be_bytes()).await?;
    } else {
        writer.write_all(&[byte0, 127]).await?;
        writer.write_all(&(len as u64).to_be_bytes()).await?;
    }

    if !frame.payload.is_empty() {
        writer.write_all(&frame.payload).await?;
    }

    writer.flush().await?;
    Ok(())
}
