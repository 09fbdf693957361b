use std::io;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info};

use telepipe_service::{
    ChannelId, ChannelRegistry, CollectorService, Endpoint, PipeService, ServiceError,
};

use crate::cmd::RelayArgs;
use crate::exit::{io_error, service_error, CliError, CliResult, DATA_INVALID, FAILURE, SUCCESS};
use crate::output::{print_envelope, OutputFormat};

const CHILD_SHUTDOWN: Duration = Duration::from_secs(1);

pub fn run(args: RelayArgs, format: OutputFormat) -> CliResult<i32> {
    let batch: Value = serde_json::from_str(&args.data)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid --data JSON: {err}")))?;

    let registry = ChannelRegistry::new();
    let pipe = registry
        .create_pipe(args.channel_id)
        .map_err(|err| service_error("create channel failed", err))?;
    let lookup_id = args.lookup_id.unwrap_or(args.channel_id);

    // SAFETY: the CLI is single-threaded here, so the child starts with
    // consistent allocator and lock state.
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(io_error("fork failed", io::Error::last_os_error()));
    }
    if pid == 0 {
        let code = match report(lookup_id, &registry, args.endpoint, &batch) {
            Ok(()) => SUCCESS,
            Err(err) => {
                error!(error = %err, endpoint = %args.endpoint, "child failed to report batch");
                FAILURE
            }
        };
        // SAFETY: _exit skips destructors and stdio buffers shared with the parent.
        unsafe { libc::_exit(code) };
    }

    let child_pid = pid as u32;
    pipe.after_fork_in_parent();
    debug!(child_pid, channel_id = args.channel_id, "waiting for child telemetry");

    let mut received = 0usize;
    let drained = loop {
        match pipe.read_envelope() {
            Ok(Some(envelope)) => {
                received += 1;
                print_envelope(&envelope, child_pid, format);
            }
            Ok(None) => break Ok(()),
            Err(err) => break Err(err),
        }
    };

    let status = wait_child(pid)?;
    drained.map_err(|err| service_error("read from child failed", err))?;
    info!(child_pid, received, status, "child finished");

    if status == 0 {
        Ok(SUCCESS)
    } else {
        Err(CliError::new(
            FAILURE,
            format!("child {child_pid} exited with status {status}"),
        ))
    }
}

fn report(
    channel_id: ChannelId,
    registry: &ChannelRegistry,
    endpoint: Endpoint,
    batch: &Value,
) -> Result<(), ServiceError> {
    let service = PipeService::new(channel_id, registry);
    let items: &[Value] = match batch {
        Value::Array(items) => items,
        other => std::slice::from_ref(other),
    };

    let result = match endpoint {
        Endpoint::AnalyticEventData => service.analytic_event_data(items),
        Endpoint::CustomEventData => service.custom_event_data(items),
        Endpoint::MetricData => service.metric_data(batch).map(|_| ()),
        Endpoint::TransactionSampleData => service.transaction_sample_data(items),
        Endpoint::ErrorData => service.error_data(items),
        Endpoint::ErrorEventData => service.error_event_data(items),
        Endpoint::SpanEventData => service.span_event_data(items),
        Endpoint::SqlTraceData => service.sql_trace_data(items),
    };
    service.shutdown(CHILD_SHUTDOWN);
    result
}

fn wait_child(pid: libc::pid_t) -> CliResult<i32> {
    let mut status: libc::c_int = 0;
    loop {
        // SAFETY: `status` is a valid out-pointer and `pid` is our own child.
        let rc = unsafe { libc::waitpid(pid, &mut status, 0) };
        if rc == pid {
            break;
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(io_error("waitpid failed", err));
        }
    }

    if libc::WIFEXITED(status) {
        Ok(libc::WEXITSTATUS(status))
    } else {
        Ok(128 + libc::WTERMSIG(status))
    }
}
