//! Supportability counters for malformed inbound trace context.

use std::sync::OnceLock;

use prometheus::{IntCounterVec, Opts, Registry};
use tracing::warn;

use crate::error::MetricsError;

/// Counter bumped once per inbound payload that fails to parse.
pub const PARSE_EXCEPTION_METRIC: &str = "Supportability/TraceContext/Parse/Exception";

/// Prometheus family holding every supportability counter.
pub const SUPPORTABILITY_FAMILY: &str = "telepipe_supportability_total";

/// Label carrying the supportability metric name.
const METRIC_LABEL: &str = "metric";

/// Counter-style metric side channel.
pub trait MetricSink: Send + Sync {
    fn increment(&self, name: &'static str);
}

/// Named counters in their own prometheus registry.
///
/// Every supportability metric is one label value of a single
/// `telepipe_supportability_total` counter family.
#[derive(Clone)]
pub struct SupportabilityMetrics {
    registry: Registry,
    counters: IntCounterVec,
}

impl SupportabilityMetrics {
    pub fn new() -> Result<Self, MetricsError> {
        let counters = IntCounterVec::new(
            Opts::new(
                SUPPORTABILITY_FAMILY,
                "Agent supportability events by metric name",
            ),
            &[METRIC_LABEL],
        )?;
        let registry = Registry::new();
        registry.register(Box::new(counters.clone()))?;
        Ok(Self { registry, counters })
    }

    /// Current value of a counter; zero if never incremented.
    pub fn count(&self, name: &str) -> u64 {
        self.counters.with_label_values(&[name]).get()
    }

    /// Every incremented counter, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        let mut counters: Vec<(String, u64)> = self
            .registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == SUPPORTABILITY_FAMILY)
            .flat_map(|family| family.get_metric().iter())
            .filter_map(|metric| {
                let name = metric
                    .get_label()
                    .iter()
                    .find(|label| label.get_name() == METRIC_LABEL)?
                    .get_value()
                    .to_string();
                let value = metric.get_counter().get_value() as u64;
                (value > 0).then_some((name, value))
            })
            .collect();
        counters.sort();
        counters
    }

    /// Registry to expose alongside the host's own metrics.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl MetricSink for SupportabilityMetrics {
    fn increment(&self, name: &'static str) {
        self.counters.with_label_values(&[name]).inc();
    }
}

impl std::fmt::Debug for SupportabilityMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupportabilityMetrics")
            .field("counters", &self.snapshot())
            .finish()
    }
}

static SUPPORTABILITY: OnceLock<Option<SupportabilityMetrics>> = OnceLock::new();

/// Process-wide counters used by [`TraceContextPayload::parse`](crate::TraceContextPayload::parse).
///
/// `None` if the counters could not be registered; parsing still works,
/// rejections just go uncounted.
pub fn supportability() -> Option<&'static SupportabilityMetrics> {
    SUPPORTABILITY
        .get_or_init(|| match SupportabilityMetrics::new() {
            Ok(metrics) => Some(metrics),
            Err(err) => {
                warn!(error = %err, "supportability counters unavailable");
                None
            }
        })
        .as_ref()
}
