use std::backtrace::Backtrace;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use telepipe_transport::current_pid;
use tracing::{debug, error, warn};

use crate::channel::{Channel, ChannelId};
use crate::collector::{CollectorService, MetricDataResponse};
use crate::envelope::{Endpoint, Envelope, ReceivedEnvelope};
use crate::error::Result;
use crate::registry::ChannelRegistry;

/// Marker file whose presence turns on the serialization self-check.
pub const MARSHAL_CHECK_PATH: &str = "/tmp/f4b961bb.marshal_check_file";

/// Pipe service configuration.
#[derive(Debug, Clone)]
pub struct PipeServiceConfig {
    /// Marker path checked on every write. Default: [`MARSHAL_CHECK_PATH`].
    pub marshal_check_path: PathBuf,
}

impl Default for PipeServiceConfig {
    fn default() -> Self {
        Self {
            marshal_check_path: PathBuf::from(MARSHAL_CHECK_PATH),
        }
    }
}

/// Where a service's envelopes go, fixed at construction.
enum PipeLink {
    Active(Arc<dyn Channel>),
    Detached,
}

/// A [`CollectorService`] for forked workers.
///
/// Every report is wrapped in an [`Envelope`] and written to the channel the
/// parent registered under `channel_id`. When no such channel exists the
/// service is detached: it logs once at construction and then drops every
/// report without error.
pub struct PipeService {
    channel_id: ChannelId,
    link: PipeLink,
    config: PipeServiceConfig,
}

impl PipeService {
    /// Attach to the channel registered under `channel_id`.
    pub fn new(channel_id: ChannelId, registry: &ChannelRegistry) -> Self {
        Self::with_config(channel_id, registry, PipeServiceConfig::default())
    }

    /// Attach with explicit configuration.
    pub fn with_config(
        channel_id: ChannelId,
        registry: &ChannelRegistry,
        config: PipeServiceConfig,
    ) -> Self {
        let link = match registry.lookup(channel_id) {
            Some(channel) => {
                let pid = current_pid();
                if channel.parent_pid() != pid {
                    channel.after_fork_in_child();
                    debug!(channel_id, pid, parent_pid = channel.parent_pid(), "attached to parent channel");
                } else {
                    warn!(channel_id, pid, "channel is owned by this process; reporting without a fork");
                }
                PipeLink::Active(channel)
            }
            None => {
                error!(
                    channel_id,
                    pid = current_pid(),
                    "no communication channel to parent process; telemetry from this process will be dropped"
                );
                PipeLink::Detached
            }
        };

        Self {
            channel_id,
            link,
            config,
        }
    }

    /// The channel id this service was built for.
    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Whether reports reach a channel.
    pub fn is_attached(&self) -> bool {
        matches!(self.link, PipeLink::Active(_))
    }

    fn write_to_pipe<T: Serialize + Debug + ?Sized>(
        &self,
        endpoint: Endpoint,
        data: &T,
    ) -> Result<()> {
        match &self.link {
            PipeLink::Active(channel) => channel.write(&self.marshal_payload(endpoint, data)?),
            PipeLink::Detached => Ok(()),
        }
    }

    fn write_batch<T: Serialize + Debug>(&self, endpoint: Endpoint, batch: &[T]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.write_to_pipe(endpoint, batch)
    }

    fn marshal_payload<T: Serialize + Debug + ?Sized>(
        &self,
        endpoint: Endpoint,
        data: &T,
    ) -> Result<Vec<u8>> {
        let dumped = Envelope::new(endpoint, data).to_bytes()?;

        if self.config.marshal_check_path.exists() {
            if let Err(err) = verify_round_trip(&dumped) {
                error!(
                    pid = current_pid(),
                    size = dumped.len(),
                    data = ?data,
                    backtrace = %Backtrace::force_capture(),
                    error = %err,
                    "failure decoding message just encoded"
                );
            }
        }

        Ok(dumped)
    }
}

fn verify_round_trip(dumped: &[u8]) -> Result<()> {
    ReceivedEnvelope::from_bytes(dumped).map(|_| ())
}

impl CollectorService for PipeService {
    /// The parent owns the collector handshake.
    fn connect(&self, _settings: &serde_json::Value) -> Result<()> {
        Ok(())
    }

    /// Children never receive agent commands directly.
    fn agent_commands(&self) -> Result<Vec<serde_json::Value>> {
        Ok(Vec::new())
    }

    fn analytic_event_data<T: Serialize + Debug>(&self, events: &[T]) -> Result<()> {
        self.write_batch(Endpoint::AnalyticEventData, events)
    }

    fn custom_event_data<T: Serialize + Debug>(&self, events: &[T]) -> Result<()> {
        self.write_batch(Endpoint::CustomEventData, events)
    }

    /// Always written, even when empty. The response is empty: there is no
    /// collector acknowledgement to relay back across the pipe.
    fn metric_data<T: Serialize + Debug + ?Sized>(
        &self,
        metrics: &T,
    ) -> Result<MetricDataResponse> {
        self.write_to_pipe(Endpoint::MetricData, metrics)?;
        Ok(MetricDataResponse::new())
    }

    fn transaction_sample_data<T: Serialize + Debug>(&self, samples: &[T]) -> Result<()> {
        self.write_batch(Endpoint::TransactionSampleData, samples)
    }

    fn error_data<T: Serialize + Debug>(&self, errors: &[T]) -> Result<()> {
        self.write_batch(Endpoint::ErrorData, errors)
    }

    fn error_event_data<T: Serialize + Debug>(&self, events: &[T]) -> Result<()> {
        self.write_batch(Endpoint::ErrorEventData, events)
    }

    fn span_event_data<T: Serialize + Debug>(&self, events: &[T]) -> Result<()> {
        self.write_batch(Endpoint::SpanEventData, events)
    }

    fn sql_trace_data<T: Serialize + Debug>(&self, traces: &[T]) -> Result<()> {
        self.write_batch(Endpoint::SqlTraceData, traces)
    }

    fn shutdown(&self, _deadline: Duration) {
        if let PipeLink::Active(channel) = &self.link {
            channel.close();
        }
    }

    fn session<R, F: FnOnce() -> R>(&self, work: F) -> R {
        work()
    }
}

impl std::fmt::Debug for PipeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeService")
            .field("channel_id", &self.channel_id)
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::error::ServiceError;

    /// Records writes; reports a foreign parent pid so the service treats it
    /// as inherited across a fork.
    #[derive(Default)]
    struct RecordingChannel {
        writes: Mutex<Vec<Vec<u8>>>,
        closes: AtomicUsize,
        child_hooks: AtomicUsize,
        same_process: bool,
        broken: bool,
    }

    impl RecordingChannel {
        fn owned_here() -> Self {
            Self {
                same_process: true,
                ..Self::default()
            }
        }

        fn broken() -> Self {
            Self {
                broken: true,
                ..Self::default()
            }
        }

        fn envelopes(&self) -> Vec<ReceivedEnvelope> {
            self.writes
                .lock()
                .unwrap()
                .iter()
                .map(|bytes| ReceivedEnvelope::from_bytes(bytes).unwrap())
                .collect()
        }
    }

    impl Channel for RecordingChannel {
        fn write(&self, bytes: &[u8]) -> Result<()> {
            if self.broken {
                return Err(ServiceError::Frame(telepipe_frame::FrameError::Io(
                    std::io::Error::from(std::io::ErrorKind::BrokenPipe),
                )));
            }
            self.writes.lock().unwrap().push(bytes.to_vec());
            Ok(())
        }

        fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }

        fn parent_pid(&self) -> u32 {
            if self.same_process {
                current_pid()
            } else {
                current_pid().wrapping_add(1)
            }
        }

        fn after_fork_in_child(&self) {
            self.child_hooks.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn attached(channel: RecordingChannel) -> (PipeService, Arc<RecordingChannel>) {
        let channel = Arc::new(channel);
        let registry = ChannelRegistry::new();
        registry.insert(1, Arc::clone(&channel) as Arc<dyn Channel>);
        let config = PipeServiceConfig {
            marshal_check_path: unique_path("absent"),
        };
        (PipeService::with_config(1, &registry, config), channel)
    }

    fn unique_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "telepipe-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ))
    }

    #[test]
    fn forked_child_runs_hook_once() {
        let (service, channel) = attached(RecordingChannel::default());
        assert!(service.is_attached());
        assert_eq!(service.channel_id(), 1);
        assert_eq!(channel.child_hooks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn owning_process_skips_hook_but_still_reports() {
        let (service, channel) = attached(RecordingChannel::owned_here());
        assert_eq!(channel.child_hooks.load(Ordering::SeqCst), 0);

        service.error_data(&[json!({"message": "boom"})]).unwrap();
        assert_eq!(channel.envelopes().len(), 1);
    }

    #[test]
    fn each_kind_writes_its_endpoint() {
        let (service, channel) = attached(RecordingChannel::default());
        let batch = [json!({"n": 1})];

        service.analytic_event_data(&batch).unwrap();
        service.custom_event_data(&batch).unwrap();
        service.metric_data(&batch).unwrap();
        service.transaction_sample_data(&batch).unwrap();
        service.error_data(&batch).unwrap();
        service.error_event_data(&batch).unwrap();
        service.span_event_data(&batch).unwrap();
        service.sql_trace_data(&batch).unwrap();

        let endpoints: Vec<Endpoint> = channel.envelopes().iter().map(|e| e.endpoint).collect();
        assert_eq!(endpoints, Endpoint::ALL.to_vec());
        for envelope in channel.envelopes() {
            assert_eq!(envelope.data, json!([{"n": 1}]));
        }
    }

    #[test]
    fn empty_batches_are_skipped() {
        let (service, channel) = attached(RecordingChannel::default());
        let empty: [serde_json::Value; 0] = [];

        service.analytic_event_data(&empty).unwrap();
        service.custom_event_data(&empty).unwrap();
        service.transaction_sample_data(&empty).unwrap();
        service.error_data(&empty).unwrap();
        service.error_event_data(&empty).unwrap();
        service.span_event_data(&empty).unwrap();
        service.sql_trace_data(&empty).unwrap();

        assert!(channel.writes.lock().unwrap().is_empty());
    }

    #[test]
    fn metric_data_always_writes_and_returns_empty_map() {
        let (service, channel) = attached(RecordingChannel::default());
        let empty: [serde_json::Value; 0] = [];

        let response = service.metric_data(&empty[..]).unwrap();
        assert!(response.is_empty());

        let envelopes = channel.envelopes();
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].endpoint, Endpoint::MetricData);
        assert_eq!(envelopes[0].data, json!([]));
    }

    #[test]
    fn detached_service_drops_everything() {
        let registry = ChannelRegistry::new();
        let bystander = Arc::new(RecordingChannel::default());
        registry.insert(2, Arc::clone(&bystander) as Arc<dyn Channel>);

        let service = PipeService::new(1, &registry);
        assert!(!service.is_attached());

        let batch = [json!({"n": 1})];
        service.analytic_event_data(&batch).unwrap();
        service.custom_event_data(&batch).unwrap();
        assert!(service.metric_data(&batch).unwrap().is_empty());
        service.transaction_sample_data(&batch).unwrap();
        service.error_data(&batch).unwrap();
        service.error_event_data(&batch).unwrap();
        service.span_event_data(&batch).unwrap();
        service.sql_trace_data(&batch).unwrap();
        service.shutdown(Duration::from_secs(1));

        assert!(bystander.writes.lock().unwrap().is_empty());
        assert_eq!(bystander.child_hooks.load(Ordering::SeqCst), 0);
        assert_eq!(bystander.closes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn write_failure_surfaces() {
        let (service, _channel) = attached(RecordingChannel::broken());
        let err = service.error_data(&[json!({})]).unwrap_err();
        assert!(matches!(err, ServiceError::Frame(_)));
        assert!(service.metric_data(&json!({})).is_err());
    }

    #[test]
    fn shutdown_closes_channel_every_call() {
        let (service, channel) = attached(RecordingChannel::default());
        service.shutdown(Duration::from_millis(10));
        service.shutdown(Duration::from_millis(10));
        assert_eq!(channel.closes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn connect_commands_and_session() {
        let (service, channel) = attached(RecordingChannel::default());
        service.connect(&json!({"license_key": "ignored"})).unwrap();
        assert!(service.agent_commands().unwrap().is_empty());
        assert_eq!(service.session(|| 40 + 2), 42);
        assert!(channel.writes.lock().unwrap().is_empty());
    }

    #[test]
    fn self_check_failure_does_not_block_send() {
        let marker = unique_path("marker");
        std::fs::write(&marker, b"").unwrap();

        let channel = Arc::new(RecordingChannel::default());
        let registry = ChannelRegistry::new();
        registry.insert(1, Arc::clone(&channel) as Arc<dyn Channel>);
        let service = PipeService::with_config(
            1,
            &registry,
            PipeServiceConfig {
                marshal_check_path: marker.clone(),
            },
        );

        // Deeper than the JSON decoder's recursion limit: encodes, cannot decode.
        let mut deep = json!(0);
        for _ in 0..200 {
            deep = json!([deep]);
        }
        let dumped = Envelope::new(Endpoint::MetricData, &deep).to_bytes().unwrap();
        assert!(verify_round_trip(&dumped).is_err());

        service.metric_data(&deep).unwrap();
        service.span_event_data(&[json!({"ok": true})]).unwrap();
        assert_eq!(channel.writes.lock().unwrap().len(), 2);
        assert_eq!(channel.writes.lock().unwrap()[0], dumped);

        let _ = std::fs::remove_file(&marker);
    }

    #[test]
    fn marker_is_checked_on_every_write() {
        let marker = unique_path("late-marker");
        let (service, channel) = {
            let channel = Arc::new(RecordingChannel::default());
            let registry = ChannelRegistry::new();
            registry.insert(1, Arc::clone(&channel) as Arc<dyn Channel>);
            let config = PipeServiceConfig {
                marshal_check_path: marker.clone(),
            };
            (PipeService::with_config(1, &registry, config), channel)
        };

        service.error_data(&[json!({"before": true})]).unwrap();
        std::fs::write(&marker, b"").unwrap();
        service.error_data(&[json!({"after": true})]).unwrap();
        std::fs::remove_file(&marker).unwrap();
        service.error_data(&[json!({"removed": true})]).unwrap();

        assert_eq!(channel.envelopes().len(), 3);
    }

    #[test]
    fn default_config_uses_well_known_marker() {
        let config = PipeServiceConfig::default();
        assert_eq!(config.marshal_check_path, PathBuf::from(MARSHAL_CHECK_PATH));
    }

    #[cfg(unix)]
    #[test]
    fn reports_reach_a_real_pipe() {
        let registry = ChannelRegistry::new();
        let pipe = registry.create_pipe(5).unwrap();
        let service = PipeService::new(5, &registry);

        service.span_event_data(&[json!({"name": "GET /"})]).unwrap();
        service.metric_data(&json!({"calls": 3})).unwrap();
        service.shutdown(Duration::from_secs(1));

        let first = pipe.read_envelope().unwrap().unwrap();
        assert_eq!(first.endpoint, Endpoint::SpanEventData);
        let second = pipe.read_envelope().unwrap().unwrap();
        assert_eq!(second.endpoint, Endpoint::MetricData);
        assert_eq!(second.data, json!({"calls": 3}));
        assert!(pipe.read_envelope().unwrap().is_none());
    }
}
