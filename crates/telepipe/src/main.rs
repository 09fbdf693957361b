mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "telepipe", version, about = "Telemetry pipe and trace context CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr). TELEPIPE_LOG overrides it.
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_encode_subcommand() {
        let cli = Cli::try_parse_from([
            "telepipe",
            "encode",
            "--account",
            "33",
            "--app",
            "2827902",
            "--sampled",
            "true",
            "--priority",
            "1.2",
        ])
        .expect("encode args should parse");

        assert!(matches!(cli.command, Command::Encode(_)));
    }

    #[test]
    fn encode_requires_account_and_app() {
        let err = Cli::try_parse_from(["telepipe", "encode", "--account", "33"])
            .expect_err("missing --app should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_decode_subcommand() {
        let cli = Cli::try_parse_from([
            "telepipe",
            "--format",
            "json",
            "decode",
            "0-0-33-2827902---1-1.2-1618876800000",
        ])
        .expect("decode args should parse");
        assert!(matches!(cli.command, Command::Decode(_)));
    }

    #[cfg(unix)]
    #[test]
    fn relay_rejects_unknown_endpoint() {
        let err = Cli::try_parse_from(["telepipe", "relay", "--endpoint", "profile_data"])
            .expect_err("unknown endpoint should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
