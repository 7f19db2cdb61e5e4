//! WebSocket frame encoding and decoding
//!
//! Frames are handled one at a time; messages split across continuation
//! frames are not reassembled. The codec plugs into `tokio_util::codec` so the
//! read half becomes a `FramedRead` stream and the write half a `FramedWrite`
//! sink.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{ClientError, Result};

/// Upper bound on speculative buffer growth while a large payload streams in
const MAX_RESERVE_CHUNK: usize = 1024 * 1024;

/// Frame opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    /// Continuation of a fragmented message (0x0)
    Continuation,
    /// UTF-8 text (0x1)
    Text,
    /// Binary data (0x2)
    Binary,
    /// Connection close (0x8)
    Close,
    /// Ping (0x9)
    Ping,
    /// Pong (0xA)
    Pong,
    /// Reserved opcode
    Reserved(u8),
}

impl OpCode {
    /// Four-bit wire value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Continuation => 0x0,
            Self::Text => 0x1,
            Self::Binary => 0x2,
            Self::Close => 0x8,
            Self::Ping => 0x9,
            Self::Pong => 0xA,
            Self::Reserved(v) => v & 0x0F,
        }
    }
}

impl From<u8> for OpCode {
    fn from(value: u8) -> Self {
        match value & 0x0F {
            0x0 => Self::Continuation,
            0x1 => Self::Text,
            0x2 => Self::Binary,
            0x8 => Self::Close,
            0x9 => Self::Ping,
            0xA => Self::Pong,
            other => Self::Reserved(other),
        }
    }
}

/// A single WebSocket frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment flag
    pub fin: bool,
    /// Frame opcode
    pub opcode: OpCode,
    /// Unmasked payload
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a final (unfragmented) frame
    pub fn new(opcode: OpCode, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            fin: true,
            opcode,
            payload: payload.into(),
        }
    }

    /// Create a text frame
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self::new(OpCode::Text, text.as_bytes())
    }

    /// Create an empty close frame
    #[must_use]
    pub fn close() -> Self {
        Self::new(OpCode::Close, Vec::new())
    }

    /// Create a pong frame echoing a ping payload
    #[must_use]
    pub fn pong(payload: Vec<u8>) -> Self {
        Self::new(OpCode::Pong, payload)
    }
}

/// XOR `data` with a 4-byte mask, index modulo 4
///
/// Applying the same mask twice restores the input.
pub fn apply_mask(data: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }
}

/// Client side frame codec
///
/// Encoded frames are always final and masked with a fresh random key. Decoded
/// frames are unmasked when the server sets the mask bit, although servers
/// normally do not.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    /// Create a codec limited only by the platform's addressable size
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_frame_size: usize::MAX,
        }
    }

    /// Reject inbound payloads larger than `bytes`
    #[must_use]
    pub const fn with_max_frame_size(mut self, bytes: usize) -> Self {
        self.max_frame_size = bytes;
        self
    }

    /// Encode a frame with an explicit mask key
    pub fn encode_with_mask(frame: &Frame, mask: [u8; 4], dst: &mut BytesMut) {
        let len = frame.payload.len();
        dst.reserve(len + 14);

        let fin = if frame.fin { 0x80 } else { 0x00 };
        dst.put_u8(fin | frame.opcode.as_u8());

        if len < 126 {
            #[allow(clippy::cast_possible_truncation)]
            dst.put_u8(0x80 | len as u8);
        } else if let Ok(short) = u16::try_from(len) {
            dst.put_u8(0x80 | 126);
            dst.put_u16(short);
        } else {
            dst.put_u8(0x80 | 127);
            dst.put_u64(len as u64);
        }

        dst.put_slice(&mask);
        let start = dst.len();
        dst.put_slice(&frame.payload);
        apply_mask(&mut dst[start..], mask);
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ClientError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        let mask: [u8; 4] = rand::random();
        Self::encode_with_mask(&frame, mask, dst);
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ClientError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if src.len() < 2 {
            return Ok(None);
        }

        let fin = src[0] & 0x80 != 0;
        let opcode = OpCode::from(src[0]);
        let masked = src[1] & 0x80 != 0;

        let (declared, mut offset) = match src[1] & 0x7F {
            126 => {
                if src.len() < 4 {
                    return Ok(None);
                }
                (u64::from(u16::from_be_bytes([src[2], src[3]])), 4)
            }
            127 => {
                if src.len() < 10 {
                    return Ok(None);
                }
                let mut ext = [0u8; 8];
                ext.copy_from_slice(&src[2..10]);
                (u64::from_be_bytes(ext), 10)
            }
            n => (u64::from(n), 2),
        };

        let len = usize::try_from(declared)
            .ok()
            .filter(|len| *len <= self.max_frame_size)
            .ok_or_else(|| ClientError::frame(format!("Frame too large ({declared} bytes)")))?;

        let mask = if masked {
            if src.len() < offset + 4 {
                return Ok(None);
            }
            let key = [src[offset], src[offset + 1], src[offset + 2], src[offset + 3]];
            offset += 4;
            Some(key)
        } else {
            None
        };

        let total = offset
            .checked_add(len)
            .ok_or_else(|| ClientError::frame(format!("Frame too large ({declared} bytes)")))?;
        if src.len() < total {
            src.reserve((total - src.len()).min(MAX_RESERVE_CHUNK));
            return Ok(None);
        }

        src.advance(offset);
        let mut payload = src.split_to(len).to_vec();
        if let Some(key) = mask {
            apply_mask(&mut payload, key);
        }

        Ok(Some(Frame {
            fin,
            opcode,
            payload,
        }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(ClientError::frame("Unexpected end of stream")),
        }
    }
}
