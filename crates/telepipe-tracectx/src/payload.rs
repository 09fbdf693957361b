use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::warn;

use crate::error::{PayloadError, Result};
use crate::metrics::{supportability, MetricSink, PARSE_EXCEPTION_METRIC};
use crate::types::{ParentType, TransportType};

/// Field separator of the wire string.
pub const DELIMITER: char = '-';

/// Number of fields in the wire string, present or not.
pub const FIELD_COUNT: usize = 9;

/// Protocol version written by [`TraceContextPayload::create`].
pub const VERSION: u32 = 0;

const TRUE_CHAR: &str = "1";
const FALSE_CHAR: &str = "0";

/// Parent identity, sampling decision and priority of a distributed trace.
///
/// Build one with [`create`](Self::create) when this process starts a trace,
/// or [`parse`](Self::parse) one received from another process. The wire
/// fields never change after construction.
#[derive(Debug, Clone)]
pub struct TraceContextPayload {
    version: u32,
    parent_type_id: u32,
    parent_account_id: String,
    parent_app_id: String,
    id: Option<String>,
    transaction_id: Option<String>,
    sampled: Option<bool>,
    priority: Option<f64>,
    timestamp: u64,
    parent_type: OnceLock<Option<ParentType>>,
    caller_transport_type: Option<TransportType>,
}

/// Named-parameter factory for [`TraceContextPayload`].
///
/// Unset fields default to version `0`, parent type `App`, timestamp "now"
/// and absent for everything else. Nothing is validated.
#[derive(Debug, Clone, Default)]
pub struct PayloadBuilder {
    version: Option<u32>,
    parent_type_id: Option<u32>,
    parent_account_id: String,
    parent_app_id: String,
    id: Option<String>,
    transaction_id: Option<String>,
    sampled: Option<bool>,
    priority: Option<f64>,
    timestamp: Option<u64>,
}

impl PayloadBuilder {
    pub fn version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    pub fn parent_type(mut self, parent_type: ParentType) -> Self {
        self.parent_type_id = Some(parent_type.id());
        self
    }

    /// Set the raw parent type id, including ids with no known label.
    pub fn parent_type_id(mut self, parent_type_id: u32) -> Self {
        self.parent_type_id = Some(parent_type_id);
        self
    }

    pub fn parent_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.parent_account_id = account_id.into();
        self
    }

    pub fn parent_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.parent_app_id = app_id.into();
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn sampled(mut self, sampled: bool) -> Self {
        self.sampled = Some(sampled);
        self
    }

    pub fn priority(mut self, priority: f64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Epoch milliseconds.
    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn build(self) -> TraceContextPayload {
        TraceContextPayload {
            version: self.version.unwrap_or(VERSION),
            parent_type_id: self.parent_type_id.unwrap_or(ParentType::App.id()),
            parent_account_id: self.parent_account_id,
            parent_app_id: self.parent_app_id,
            id: self.id,
            transaction_id: self.transaction_id,
            sampled: self.sampled,
            priority: self.priority,
            timestamp: self.timestamp.unwrap_or_else(now_ms),
            parent_type: OnceLock::new(),
            caller_transport_type: None,
        }
    }
}

impl TraceContextPayload {
    /// Start a locally originated payload.
    pub fn create() -> PayloadBuilder {
        PayloadBuilder::default()
    }

    /// Parse an inbound wire string, reporting failures to the process-wide
    /// supportability counters.
    ///
    /// A `None` must be handled exactly like a request that carried no trace
    /// context at all.
    pub fn parse(input: &str) -> Option<Self> {
        Self::parse_reported(input).ok()
    }

    /// Parse an inbound wire string, reporting failures to `metrics`.
    pub fn parse_with(input: &str, metrics: &dyn MetricSink) -> Option<Self> {
        Self::report(input, Some(metrics)).ok()
    }

    /// Like [`parse`](Self::parse), but hands back the rejection reason after
    /// counting and logging it.
    pub fn parse_reported(input: &str) -> Result<Self> {
        Self::report(input, supportability().map(|metrics| metrics as &dyn MetricSink))
    }

    fn report(input: &str, metrics: Option<&dyn MetricSink>) -> Result<Self> {
        Self::try_parse(input).inspect_err(|err| {
            if let Some(metrics) = metrics {
                metrics.increment(PARSE_EXCEPTION_METRIC);
            }
            if *err == PayloadError::MissingAttributes {
                warn!("error parsing trace context payload: {err}");
            } else {
                warn!(error = %err, "error parsing trace context payload");
            }
        })
    }

    /// Decode and validate a wire string, returning why it was rejected.
    ///
    /// Has no side effects; [`parse`](Self::parse) is the boundary operation.
    pub fn try_parse(input: &str) -> Result<Self> {
        let mut tokens = input.split(DELIMITER);

        let version = integer_token::<u32>("version", tokens.next())?;
        let parent_type_id = integer_token::<u32>("parent_type", tokens.next())?;
        let parent_account_id = tokens.next();
        let parent_app_id = tokens.next();
        let id = value_or_none(tokens.next());
        let transaction_id = value_or_none(tokens.next());
        let sampled = sampled_token(tokens.next())?;
        let priority = priority_token(tokens.next())?;
        let timestamp = integer_token::<u64>("timestamp", tokens.next())?;

        let (Some(version), Some(parent_type_id), Some(account), Some(app), Some(timestamp)) =
            (version, parent_type_id, parent_account_id, parent_app_id, timestamp)
        else {
            return Err(PayloadError::MissingAttributes);
        };

        let mut builder = Self::create()
            .version(version)
            .parent_type_id(parent_type_id)
            .parent_account_id(account)
            .parent_app_id(app)
            .timestamp(timestamp);
        builder.id = id;
        builder.transaction_id = transaction_id;
        builder.sampled = sampled;
        builder.priority = priority;

        let payload = builder.build();
        if !payload.is_valid() {
            return Err(PayloadError::MissingAttributes);
        }
        Ok(payload)
    }

    /// Whether every required attribute is present and non-empty.
    pub fn is_valid(&self) -> bool {
        !self.parent_account_id.is_empty() && !self.parent_app_id.is_empty()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn parent_type_id(&self) -> u32 {
        self.parent_type_id
    }

    /// Label of the parent type id, `None` for ids outside the known table.
    pub fn parent_type(&self) -> Option<ParentType> {
        *self
            .parent_type
            .get_or_init(|| ParentType::from_id(self.parent_type_id))
    }

    pub fn parent_account_id(&self) -> &str {
        &self.parent_account_id
    }

    pub fn parent_app_id(&self) -> &str {
        &self.parent_app_id
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    /// Sampling decision; `None` when the sender had not made one.
    pub fn sampled(&self) -> Option<bool> {
        self.sampled
    }

    /// True only for an explicit positive sampling decision.
    pub fn is_sampled(&self) -> bool {
        self.sampled == Some(true)
    }

    pub fn priority(&self) -> Option<f64> {
        self.priority
    }

    /// Epoch milliseconds.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn caller_transport_type(&self) -> Option<TransportType> {
        self.caller_transport_type
    }

    /// Record how this payload was received, normalized via
    /// [`TransportType::from_value`].
    pub fn set_caller_transport_type(&mut self, value: &str) {
        self.caller_transport_type = Some(TransportType::from_value(value));
    }
}

/// Compares the wire fields only.
impl PartialEq for TraceContextPayload {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.parent_type_id == other.parent_type_id
            && self.parent_account_id == other.parent_account_id
            && self.parent_app_id == other.parent_app_id
            && self.id == other.id
            && self.transaction_id == other.transaction_id
            && self.sampled == other.sampled
            && self.priority == other.priority
            && self.timestamp == other.timestamp
    }
}

/// Renders the wire string. Does not validate.
impl fmt::Display for TraceContextPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sampled = match self.sampled {
            Some(true) => TRUE_CHAR,
            Some(false) => FALSE_CHAR,
            None => "",
        };
        let priority = self.priority.map(format_priority).unwrap_or_default();

        write!(
            f,
            "{version}{d}{parent_type}{d}{account}{d}{app}{d}{id}{d}{txn}{d}{sampled}{d}{priority}{d}{timestamp}",
            version = self.version,
            parent_type = self.parent_type_id,
            account = self.parent_account_id,
            app = self.parent_app_id,
            id = self.id.as_deref().unwrap_or_default(),
            txn = self.transaction_id.as_deref().unwrap_or_default(),
            timestamp = self.timestamp,
            d = DELIMITER,
        )
    }
}

/// Shortest decimal that parses back to the same `f64`, with `.0` kept on
/// whole numbers.
fn format_priority(priority: f64) -> String {
    let mut rendered = priority.to_string();
    if priority.is_finite() && !rendered.contains('.') {
        rendered.push_str(".0");
    }
    rendered
}

fn integer_token<T: FromStr>(field: &'static str, token: Option<&str>) -> Result<Option<T>> {
    token
        .map(|value| {
            value.parse::<T>().map_err(|_| PayloadError::InvalidInteger {
                field,
                value: value.to_string(),
            })
        })
        .transpose()
}

fn value_or_none(token: Option<&str>) -> Option<String> {
    token.filter(|value| !value.is_empty()).map(str::to_string)
}

fn sampled_token(token: Option<&str>) -> Result<Option<bool>> {
    match token {
        None | Some("") => Ok(None),
        Some(TRUE_CHAR) => Ok(Some(true)),
        Some(FALSE_CHAR) => Ok(Some(false)),
        Some(other) => Err(PayloadError::InvalidSampled(other.to_string())),
    }
}

fn priority_token(token: Option<&str>) -> Result<Option<f64>> {
    match token {
        None | Some("") => Ok(None),
        Some(value) => match value.parse::<f64>() {
            Ok(priority) if priority.is_finite() => Ok(Some(priority)),
            _ => Err(PayloadError::InvalidPriority(value.to_string())),
        },
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
