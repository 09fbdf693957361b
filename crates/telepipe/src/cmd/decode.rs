use telepipe_tracectx::TraceContextPayload;

use crate::cmd::DecodeArgs;
use crate::exit::{payload_error, CliResult, SUCCESS};
use crate::output::{print_payload, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut payload = TraceContextPayload::parse_reported(args.payload.trim())
        .map_err(|err| payload_error("decode failed", err))?;

    if let Some(transport) = args.transport.as_deref() {
        payload.set_caller_transport_type(transport);
    }

    print_payload(&payload, format);
    Ok(SUCCESS)
}
