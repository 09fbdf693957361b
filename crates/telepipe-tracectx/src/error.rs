/// Reasons a trace context string fails to decode.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PayloadError {
    /// An integer field did not hold an unsigned integer.
    #[error("{field} is not an integer: {value:?}")]
    InvalidInteger { field: &'static str, value: String },

    /// The sampled flag was present but neither `1` nor `0`.
    #[error("sampled flag must be 1 or 0: {0:?}")]
    InvalidSampled(String),

    /// The priority was present but not a finite number.
    #[error("priority is not a finite number: {0:?}")]
    InvalidPriority(String),

    /// Coercion succeeded but required attributes are missing or empty.
    #[error("payload missing attributes")]
    MissingAttributes,
}

pub type Result<T> = std::result::Result<T, PayloadError>;

/// Failure to set up the supportability counters.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("metric registration failed: {0}")]
    Registration(#[from] prometheus::Error),
}
