use tracing::debug;

use telepipe_tracectx::TraceContextPayload;

use crate::cmd::EncodeArgs;
use crate::exit::{CliError, CliResult, DATA_INVALID, SUCCESS};

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let mut builder = TraceContextPayload::create()
        .version(args.protocol_version)
        .parent_type_id(args.parent_type)
        .parent_account_id(args.account)
        .parent_app_id(args.app);
    if let Some(id) = args.id {
        builder = builder.id(id);
    }
    if let Some(transaction) = args.transaction {
        builder = builder.transaction_id(transaction);
    }
    if let Some(sampled) = args.sampled {
        builder = builder.sampled(sampled);
    }
    if let Some(priority) = args.priority {
        if !priority.is_finite() {
            return Err(CliError::new(
                DATA_INVALID,
                format!("priority must be finite, got {priority}"),
            ));
        }
        builder = builder.priority(priority);
    }
    if let Some(timestamp) = args.timestamp {
        builder = builder.timestamp(timestamp);
    }

    let payload = builder.build();
    if !payload.is_valid() {
        return Err(CliError::new(
            DATA_INVALID,
            "account and app ids must be non-empty",
        ));
    }
    debug!(parent_type = ?payload.parent_type(), "encoded trace context payload");

    println!("{payload}");
    Ok(SUCCESS)
}
