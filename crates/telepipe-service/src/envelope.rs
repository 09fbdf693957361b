use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Telemetry kind an envelope carries, named after the collector endpoint
/// the parent eventually submits it to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    AnalyticEventData,
    CustomEventData,
    MetricData,
    TransactionSampleData,
    ErrorData,
    ErrorEventData,
    SpanEventData,
    SqlTraceData,
}

impl Endpoint {
    /// Every endpoint, in declaration order.
    pub const ALL: [Endpoint; 8] = [
        Endpoint::AnalyticEventData,
        Endpoint::CustomEventData,
        Endpoint::MetricData,
        Endpoint::TransactionSampleData,
        Endpoint::ErrorData,
        Endpoint::ErrorEventData,
        Endpoint::SpanEventData,
        Endpoint::SqlTraceData,
    ];

    /// Wire name of the endpoint.
    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::AnalyticEventData => "analytic_event_data",
            Endpoint::CustomEventData => "custom_event_data",
            Endpoint::MetricData => "metric_data",
            Endpoint::TransactionSampleData => "transaction_sample_data",
            Endpoint::ErrorData => "error_data",
            Endpoint::ErrorEventData => "error_event_data",
            Endpoint::SpanEventData => "span_event_data",
            Endpoint::SqlTraceData => "sql_trace_data",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Endpoint::ALL
            .into_iter()
            .find(|endpoint| endpoint.as_str() == s)
            .ok_or_else(|| format!("unknown endpoint: {s}"))
    }
}

/// An outbound `(endpoint, data)` pair, borrowed for the length of one send.
///
/// Serializes as the two-element JSON array `["<endpoint>", <data>]`.
#[derive(Debug)]
pub struct Envelope<'a, T: ?Sized> {
    pub endpoint: Endpoint,
    pub data: &'a T,
}

impl<'a, T: Serialize + ?Sized> Envelope<'a, T> {
    pub fn new(endpoint: Endpoint, data: &'a T) -> Self {
        Self { endpoint, data }
    }

    /// Serialize to the shared wire format.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&(self.endpoint, self.data))?)
    }
}

/// An envelope decoded on the reading side of a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedEnvelope {
    pub endpoint: Endpoint,
    pub data: serde_json::Value,
}

impl ReceivedEnvelope {
    /// Decode the wire format produced by [`Envelope::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (endpoint, data): (Endpoint, serde_json::Value) = serde_json::from_slice(bytes)?;
        Ok(Self { endpoint, data })
    }
}
