use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use telepipe_transport::IpcStream;
use tracing::debug;

use crate::codec::{Frame, FrameConfig, FrameHeader, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Reads whole frames from the receiving end of a pipe.
///
/// Partial reads are retried internally, so callers always get complete frames.
pub struct FrameReader<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Read the next frame, treating any end of stream as an error.
    pub fn read_frame(&mut self) -> Result<Frame> {
        self.try_read_frame()?.ok_or(FrameError::ConnectionClosed)
    }

    /// Read the next frame, distinguishing a clean close.
    ///
    /// Returns `Ok(None)` when the stream ends on a frame boundary, which is
    /// how a parent learns that every writer has gone. An end of stream
    /// inside a frame is `Err(FrameError::ConnectionClosed)`.
    pub fn try_read_frame(&mut self) -> Result<Option<Frame>> {
        let mut raw = [0u8; HEADER_SIZE];
        if self.fill(&mut raw)? == 0 {
            return Ok(None);
        }
        let header = FrameHeader::parse(&raw, self.config.max_payload_size)
            .inspect_err(|err| debug!(error = %err, "rejected frame header"))?;

        let mut payload = BytesMut::zeroed(header.payload_len);
        if self.fill(&mut payload)? < header.payload_len {
            return Err(FrameError::ConnectionClosed);
        }

        Ok(Some(Frame {
            version: header.version,
            payload: payload.freeze(),
        }))
    }

    /// Fill `buf` completely, returning fewer bytes only at end of stream.
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        if filled > 0 && filled < buf.len() {
            return Err(FrameError::ConnectionClosed);
        }
        Ok(filled)
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<IpcStream> {
    /// Wrap the reading end of a pipe and apply the configured read timeout.
    pub fn with_config_ipc(inner: IpcStream, config: FrameConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}
