use std::io::{Read, Write};

use tracing::debug;

use crate::error::{Result, TransportError};

/// Process id of the calling process.
///
/// Re-read on every call, so the value is correct in a forked child.
pub fn current_pid() -> u32 {
    std::process::id()
}

/// A connected IPC stream implementing Read + Write.
///
/// On Unix this wraps one end of a connected Unix domain socket pair.
/// Both ends survive `fork()`, which is what lets a child write telemetry
/// into a stream its parent created.
pub struct IpcStream {
    inner: IpcStreamInner,
}

enum IpcStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    #[cfg(not(unix))]
    Unsupported(std::convert::Infallible),
}

impl Read for IpcStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.read(buf),
            #[cfg(not(unix))]
            IpcStreamInner::Unsupported(never) => match *never {},
        }
    }
}

impl Write for IpcStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.write(buf),
            #[cfg(not(unix))]
            IpcStreamInner::Unsupported(never) => match *never {},
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.flush(),
            #[cfg(not(unix))]
            IpcStreamInner::Unsupported(never) => match *never {},
        }
    }
}

impl IpcStream {
    /// Create an unnamed, connected pair of streams.
    ///
    /// Returns `(reader, writer)`. The naming is a convention only: both
    /// ends are full duplex.
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (reader, writer) =
            std::os::unix::net::UnixStream::pair().map_err(TransportError::Pair)?;
        debug!(pid = current_pid(), "created unix stream pair");
        Ok((Self::from_unix(reader), Self::from_unix(writer)))
    }

    /// Create an unnamed, connected pair of streams.
    #[cfg(not(unix))]
    pub fn pair() -> Result<(Self, Self)> {
        Err(TransportError::Unsupported)
    }

    /// Create an IpcStream from a Unix domain socket stream.
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: IpcStreamInner::Unix(stream),
        }
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(not(unix))]
            IpcStreamInner::Unsupported(never) => match *never {},
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(not(unix))]
            IpcStreamInner::Unsupported(never) => match *never {},
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => {
                let cloned = stream.try_clone()?;
                Ok(Self::from_unix(cloned))
            }
            #[cfg(not(unix))]
            IpcStreamInner::Unsupported(never) => match *never {},
        }
    }
}

impl std::fmt::Debug for IpcStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(_) => f.debug_struct("IpcStream").field("type", &"unix").finish(),
            #[cfg(not(unix))]
            IpcStreamInner::Unsupported(never) => match *never {},
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn pair_is_connected() {
        let (mut reader, mut writer) = IpcStream::pair().unwrap();
        writer.write_all(b"hello").unwrap();

        let mut buf = [0u8; 5];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn pair_is_duplex() {
        let (mut a, mut b) = IpcStream::pair().unwrap();
        a.write_all(b"ping").unwrap();
        b.write_all(b"pong").unwrap();

        let mut buf = [0u8; 4];
        b.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");
        a.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"pong");
    }

    #[test]
    fn dropping_writer_signals_eof() {
        let (mut reader, writer) = IpcStream::pair().unwrap();
        drop(writer);

        let mut buf = Vec::new();
        let read = reader.read_to_end(&mut buf).unwrap();
        assert_eq!(read, 0);
    }

    #[test]
    fn read_timeout_applies() {
        let (mut reader, _writer) = IpcStream::pair().unwrap();
        reader
            .set_read_timeout(Some(std::time::Duration::from_millis(10)))
            .unwrap();

        let mut buf = [0u8; 1];
        let err = reader.read(&mut buf).unwrap_err();
        assert!(matches!(
            err.kind(),
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
        ));
    }

    #[test]
    fn current_pid_matches_std() {
        assert_eq!(current_pid(), std::process::id());
    }
}
