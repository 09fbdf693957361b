use telepipe_transport::TransportError;

/// Errors raised while framing pipe writes or reading them back.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The header does not start with the "TP" magic, so the stream is out of sync.
    #[error("invalid frame magic (expected \"TP\")")]
    InvalidMagic,

    /// The frame was written by an incompatible wire version.
    #[error("unsupported wire version {found} (expected {expected})")]
    UnsupportedVersion { found: u16, expected: u16 },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The underlying stream failed.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer went away in the middle of a frame.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl From<TransportError> for FrameError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(io) | TransportError::Pair(io) => FrameError::Io(io),
            other => FrameError::Io(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                other.to_string(),
            )),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
