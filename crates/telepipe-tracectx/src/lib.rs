//! Trace context propagation payloads.
//!
//! A [`TraceContextPayload`] carries a distributed trace's parent identity,
//! sampling decision and priority through a single string-valued carrier
//! (a header, a queue message attribute, a field forwarded through a pipe):
//!
//! ```text
//! version-parentType-accountId-appId-id-transactionId-sampled-priority-timestamp
//! 0-0-33-2827902-e8b91a159289ff74-e8b91a159289ff74-1-1.2-1618876800000
//! ```
//!
//! Locally created payloads are trusted as-is. Received payloads are only
//! accepted through [`TraceContextPayload::parse`], which validates them and
//! turns every failure into "no trace context".

pub mod error;
pub mod metrics;
pub mod payload;
pub mod types;

pub use error::{MetricsError, PayloadError, Result};
pub use metrics::{
    supportability, MetricSink, SupportabilityMetrics, PARSE_EXCEPTION_METRIC,
    SUPPORTABILITY_FAMILY,
};
pub use payload::{PayloadBuilder, TraceContextPayload, DELIMITER, FIELD_COUNT};
pub use types::{ParentType, TransportType};
