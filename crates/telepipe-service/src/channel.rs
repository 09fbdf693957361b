use crate::error::Result;

/// Identifier a parent assigns to a channel before forking.
pub type ChannelId = u32;

/// A byte-oriented conduit from forked children to the parent that created it.
///
/// Implementations must make each [`write`](Channel::write) atomic with
/// respect to other writers in the same process: the bytes of two calls
/// never interleave. [`PipeService`](crate::PipeService) adds no locking of
/// its own.
pub trait Channel: Send + Sync {
    /// Write one complete message.
    fn write(&self, bytes: &[u8]) -> Result<()>;

    /// Close this process's write side. Calling it again is a no-op.
    fn close(&self);

    /// Process id of the process that created the channel.
    fn parent_pid(&self) -> u32;

    /// Finish local setup in a freshly forked child. Called once per child.
    fn after_fork_in_child(&self);
}
