use std::fmt::Debug;
use std::time::Duration;

use serde::Serialize;

use crate::error::Result;

/// Response body of a `metric_data` submission.
pub type MetricDataResponse = serde_json::Map<String, serde_json::Value>;

/// The reporting surface instrumentation talks to.
///
/// A network collector client and [`PipeService`](crate::PipeService) both
/// implement it, so harvest code is identical before and after a fork.
/// Batch methods skip empty batches; `metric_data` always submits.
pub trait CollectorService {
    /// Perform the collector handshake.
    fn connect(&self, settings: &serde_json::Value) -> Result<()>;

    /// Fetch pending agent commands.
    fn agent_commands(&self) -> Result<Vec<serde_json::Value>>;

    fn analytic_event_data<T: Serialize + Debug>(&self, events: &[T]) -> Result<()>;

    fn custom_event_data<T: Serialize + Debug>(&self, events: &[T]) -> Result<()>;

    fn metric_data<T: Serialize + Debug + ?Sized>(&self, metrics: &T)
        -> Result<MetricDataResponse>;

    fn transaction_sample_data<T: Serialize + Debug>(&self, samples: &[T]) -> Result<()>;

    fn error_data<T: Serialize + Debug>(&self, errors: &[T]) -> Result<()>;

    fn error_event_data<T: Serialize + Debug>(&self, events: &[T]) -> Result<()>;

    fn span_event_data<T: Serialize + Debug>(&self, events: &[T]) -> Result<()>;

    fn sql_trace_data<T: Serialize + Debug>(&self, traces: &[T]) -> Result<()>;

    /// Release the underlying connection. Safe to call more than once.
    fn shutdown(&self, deadline: Duration);

    /// Run `work` inside one collector session and return its result.
    fn session<R, F: FnOnce() -> R>(&self, work: F) -> R;
}
