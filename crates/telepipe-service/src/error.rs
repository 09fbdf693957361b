use crate::channel::ChannelId;

/// Errors that can occur in pipe service operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] telepipe_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] telepipe_frame::FrameError),

    /// Envelope serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The channel end needed for this operation has been closed.
    #[error("channel closed")]
    ChannelClosed,

    /// A channel is already registered under this id.
    #[error("channel {0} already registered")]
    ChannelExists(ChannelId),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
