use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use telepipe_transport::IpcStream;

use crate::codec::{encode_frame, Frame, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Writes whole frames to the sending end of a pipe.
///
/// Each frame is encoded into a scratch buffer and handed to the stream in
/// one `write_all`, so a caller that serializes access to the writer never
/// interleaves two frames. A write timeout surfaces as `FrameError::Io`
/// instead of being retried.
pub struct FrameWriter<T> {
    inner: T,
    scratch: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            scratch: BytesMut::with_capacity(HEADER_SIZE),
            config,
        }
    }

    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.payload.as_ref())
    }

    /// Frame `payload` and write it out, flushing before returning.
    ///
    /// Oversized payloads are rejected before any byte reaches the stream.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_size,
            });
        }

        self.scratch.clear();
        encode_frame(payload, &mut self.scratch)?;
        self.inner
            .write_all(&self.scratch)
            .map_err(closed_on_write_zero)?;
        self.flush()
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().map_err(closed_on_write_zero)
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

impl FrameWriter<IpcStream> {
    /// Wrap the writing end of a pipe and apply the configured write timeout.
    pub fn with_config_ipc(inner: IpcStream, config: FrameConfig) -> Result<Self> {
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}

fn closed_on_write_zero(err: std::io::Error) -> FrameError {
    if err.kind() == ErrorKind::WriteZero {
        FrameError::ConnectionClosed
    } else {
        FrameError::Io(err)
    }
}
