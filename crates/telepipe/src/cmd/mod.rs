use clap::{Args, Subcommand};
#[cfg(unix)]
use telepipe_service::{ChannelId, Endpoint};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
#[cfg(unix)]
pub mod relay;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a trace context payload as a wire string.
    Encode(EncodeArgs),
    /// Parse and validate a trace context wire string.
    Decode(DecodeArgs),
    /// Fork a child that reports one batch through a pipe, and print what the parent receives.
    #[cfg(unix)]
    Relay(RelayArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args),
        Command::Decode(args) => decode::run(args, format),
        #[cfg(unix)]
        Command::Relay(args) => relay::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Protocol version.
    #[arg(long, default_value = "0")]
    pub protocol_version: u32,
    /// Parent type id (0=App, 1=Browser, 2=Mobile).
    #[arg(long, default_value = "0")]
    pub parent_type: u32,
    /// Parent account id.
    #[arg(long)]
    pub account: String,
    /// Parent application id.
    #[arg(long)]
    pub app: String,
    /// Trace participant id.
    #[arg(long)]
    pub id: Option<String>,
    /// Transaction id.
    #[arg(long)]
    pub transaction: Option<String>,
    /// Sampling decision (true/false). Omit when unknown.
    #[arg(long)]
    pub sampled: Option<bool>,
    /// Sampling priority.
    #[arg(long)]
    pub priority: Option<f64>,
    /// Epoch milliseconds. Default: now.
    #[arg(long)]
    pub timestamp: Option<u64>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Wire string to parse.
    pub payload: String,
    /// Transport the payload arrived on (e.g. HTTP, https, Kafka).
    #[arg(long)]
    pub transport: Option<String>,
}

#[cfg(unix)]
#[derive(Args, Debug)]
pub struct RelayArgs {
    /// Channel id the parent registers.
    #[arg(long, env = "TELEPIPE_CHANNEL_ID", default_value = "1")]
    pub channel_id: ChannelId,
    /// Channel id the child looks up. Default: --channel-id.
    #[arg(long)]
    pub lookup_id: Option<ChannelId>,
    /// Telemetry kind to report.
    #[arg(long, default_value = "analytic_event_data", value_parser = parse_endpoint)]
    pub endpoint: Endpoint,
    /// JSON batch to report. A non-array is sent as a batch of one.
    #[arg(long, default_value = "[]")]
    pub data: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[cfg(unix)]
fn parse_endpoint(value: &str) -> Result<Endpoint, String> {
    value.parse()
}
