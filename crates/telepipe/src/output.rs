use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use telepipe_service::ReceivedEnvelope;
use telepipe_tracectx::{ParentType, TraceContextPayload, TransportType};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct EnvelopeOutput<'a> {
    endpoint: &'a str,
    data: &'a serde_json::Value,
    child_pid: u32,
}

pub fn print_envelope(envelope: &ReceivedEnvelope, child_pid: u32, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = EnvelopeOutput {
                endpoint: envelope.endpoint.as_str(),
                data: &envelope.data,
                child_pid,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ENDPOINT", "CHILD", "DATA"])
                .add_row(vec![
                    envelope.endpoint.to_string(),
                    child_pid.to_string(),
                    envelope.data.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "endpoint={} child={} data={}",
                envelope.endpoint, child_pid, envelope.data
            );
        }
        OutputFormat::Raw => {
            println!("{}", envelope.data);
        }
    }
}

#[derive(Serialize)]
struct PayloadOutput<'a> {
    wire: String,
    valid: bool,
    version: u32,
    parent_type_id: u32,
    parent_type: Option<ParentType>,
    parent_account_id: &'a str,
    parent_app_id: &'a str,
    id: Option<&'a str>,
    transaction_id: Option<&'a str>,
    sampled: Option<bool>,
    priority: Option<f64>,
    timestamp: u64,
    caller_transport_type: Option<TransportType>,
}

impl<'a> PayloadOutput<'a> {
    fn from_payload(payload: &'a TraceContextPayload) -> Self {
        Self {
            wire: payload.to_string(),
            valid: payload.is_valid(),
            version: payload.version(),
            parent_type_id: payload.parent_type_id(),
            parent_type: payload.parent_type(),
            parent_account_id: payload.parent_account_id(),
            parent_app_id: payload.parent_app_id(),
            id: payload.id(),
            transaction_id: payload.transaction_id(),
            sampled: payload.sampled(),
            priority: payload.priority(),
            timestamp: payload.timestamp(),
            caller_transport_type: payload.caller_transport_type(),
        }
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("version", self.version.to_string()),
            ("parent_type", display_or_dash(self.parent_type)),
            ("parent_type_id", self.parent_type_id.to_string()),
            ("parent_account_id", self.parent_account_id.to_string()),
            ("parent_app_id", self.parent_app_id.to_string()),
            ("id", display_or_dash(self.id)),
            ("transaction_id", display_or_dash(self.transaction_id)),
            ("sampled", display_or_dash(self.sampled)),
            ("priority", display_or_dash(self.priority)),
            ("timestamp", self.timestamp.to_string()),
            ("caller_transport_type", display_or_dash(self.caller_transport_type)),
        ]
    }
}

pub fn print_payload(payload: &TraceContextPayload, format: OutputFormat) {
    let out = PayloadOutput::from_payload(payload);
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (field, value) in out.rows() {
                table.add_row(vec![field.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line: Vec<String> = out
                .rows()
                .into_iter()
                .map(|(field, value)| format!("{field}={value}"))
                .collect();
            println!("{}", line.join(" "));
        }
        OutputFormat::Raw => {
            println!("{}", out.wire);
        }
    }
}

fn display_or_dash<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
