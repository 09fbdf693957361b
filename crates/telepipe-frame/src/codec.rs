use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Bytes in a frame header: magic, payload length, wire version.
pub const HEADER_SIZE: usize = 8;

/// Magic bytes: "TP".
pub const MAGIC: [u8; 2] = *b"TP";

/// Wire version written by this build.
///
/// A parent and a child built from different releases disagree here first,
/// before any payload is decoded.
pub const WIRE_VERSION: u16 = 1;

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// One channel write: a single serialized envelope.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Wire version the frame was written with.
    pub version: u16,
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame at the current wire version.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            version: WIRE_VERSION,
            payload: payload.into(),
        }
    }

    /// Header plus payload length.
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameHeader {
    pub(crate) payload_len: usize,
    pub(crate) version: u16,
}

impl FrameHeader {
    /// Validate a raw header against the magic, the wire version and `max_payload`.
    pub(crate) fn parse(raw: &[u8; HEADER_SIZE], max_payload: usize) -> Result<Self> {
        if raw[..2] != MAGIC {
            return Err(FrameError::InvalidMagic);
        }

        let payload_len = u32::from_le_bytes([raw[2], raw[3], raw[4], raw[5]]) as usize;
        let version = u16::from_le_bytes([raw[6], raw[7]]);

        if version != WIRE_VERSION {
            return Err(FrameError::UnsupportedVersion {
                found: version,
                expected: WIRE_VERSION,
            });
        }
        if payload_len > max_payload {
            return Err(FrameError::PayloadTooLarge {
                size: payload_len,
                max: max_payload,
            });
        }

        Ok(Self {
            payload_len,
            version,
        })
    }
}

/// Append one frame carrying `payload` to `dst`.
///
/// ```text
/// +-----------+--------------+--------------+-----------------+
/// | "TP" (2B) | length (4B)  | version (2B) | payload         |
/// |           | little end.  | little end.  | (length bytes)  |
/// +-----------+--------------+--------------+-----------------+
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;

    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&MAGIC);
    dst.put_u32_le(len);
    dst.put_u16_le(WIRE_VERSION);
    dst.put_slice(payload);
    Ok(())
}

/// Take one complete frame off the front of `src`.
///
/// Returns `Ok(None)` and leaves `src` untouched while the frame is still
/// incomplete. Header errors are reported as soon as the header is present.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    let Some(raw) = src.get(..HEADER_SIZE) else {
        return Ok(None);
    };
    let mut header = [0u8; HEADER_SIZE];
    header.copy_from_slice(raw);
    let header = FrameHeader::parse(&header, max_payload)?;

    if src.len() < HEADER_SIZE + header.payload_len {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    Ok(Some(Frame {
        version: header.version,
        payload: src.split_to(header.payload_len).freeze(),
    }))
}

/// Limits and timeouts for a framed pipe.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Largest payload accepted in either direction. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Applied to the reading end. `None` blocks until the peer writes or closes.
    pub read_timeout: Option<std::time::Duration>,
    /// Applied to the writing end. `None` blocks while the pipe is full.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
