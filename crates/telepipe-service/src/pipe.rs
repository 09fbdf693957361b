//! Socket-pair channel shared across `fork()`.
#![cfg(unix)]

use std::sync::{Mutex, MutexGuard, PoisonError};

use telepipe_frame::{FrameConfig, FrameReader, FrameWriter};
use telepipe_transport::{current_pid, IpcStream};
use tracing::debug;

use crate::channel::Channel;
use crate::envelope::ReceivedEnvelope;
use crate::error::{Result, ServiceError};

/// A [`Channel`] over a connected Unix socket pair.
///
/// The parent opens it before forking. Children inherit both ends, keep the
/// writer and drop the reader in [`after_fork_in_child`](Channel::after_fork_in_child);
/// the parent keeps the reader and drops the writer in
/// [`after_fork_in_parent`](PipeChannel::after_fork_in_parent).
///
/// Each envelope is one frame written under the writer lock, so writes from
/// threads of one process never interleave. Use one channel per child.
pub struct PipeChannel {
    parent_pid: u32,
    reader: Mutex<Option<FrameReader<IpcStream>>>,
    writer: Mutex<Option<FrameWriter<IpcStream>>>,
}

impl PipeChannel {
    /// Open a channel owned by the calling process.
    pub fn open() -> Result<Self> {
        Self::with_config(FrameConfig::default())
    }

    /// Open a channel with explicit frame configuration.
    pub fn with_config(config: FrameConfig) -> Result<Self> {
        let (reader, writer) = IpcStream::pair()?;
        let reader = FrameReader::with_config_ipc(reader, config.clone())?;
        let writer = FrameWriter::with_config_ipc(writer, config)?;
        Ok(Self {
            parent_pid: current_pid(),
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
        })
    }

    /// Drop the parent's copy of the write end.
    ///
    /// Once every child has closed its copy too, [`read_envelope`](Self::read_envelope)
    /// sees EOF.
    pub fn after_fork_in_parent(&self) {
        if lock(&self.writer).take().is_some() {
            debug!(pid = current_pid(), "parent released pipe writer");
        }
    }

    /// Block for the next envelope from a child.
    ///
    /// Returns `Ok(None)` once every writer has closed.
    pub fn read_envelope(&self) -> Result<Option<ReceivedEnvelope>> {
        let mut guard = lock(&self.reader);
        let reader = guard.as_mut().ok_or(ServiceError::ChannelClosed)?;
        match reader.try_read_frame()? {
            Some(frame) => ReceivedEnvelope::from_bytes(frame.payload.as_ref()).map(Some),
            None => Ok(None),
        }
    }

    /// Whether this process still holds the write end.
    pub fn is_writable(&self) -> bool {
        lock(&self.writer).is_some()
    }
}

impl Channel for PipeChannel {
    fn write(&self, bytes: &[u8]) -> Result<()> {
        let mut guard = lock(&self.writer);
        let writer = guard.as_mut().ok_or(ServiceError::ChannelClosed)?;
        writer.send(bytes)?;
        Ok(())
    }

    fn close(&self) {
        if lock(&self.writer).take().is_some() {
            debug!(pid = current_pid(), "pipe writer closed");
        }
    }

    fn parent_pid(&self) -> u32 {
        self.parent_pid
    }

    fn after_fork_in_child(&self) {
        if lock(&self.reader).take().is_some() {
            debug!(pid = current_pid(), "child released pipe reader");
        }
    }
}

impl std::fmt::Debug for PipeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeChannel")
            .field("parent_pid", &self.parent_pid)
            .field("writable", &self.is_writable())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
