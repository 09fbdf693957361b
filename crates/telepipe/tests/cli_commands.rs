#![cfg(all(unix, feature = "cli"))]

use std::process::{Command, Output};

const EXAMPLE: &str = "0-0-33-2827902-e8b91a159289ff74-e8b91a159289ff74-1-1.2-1618876800000";

fn telepipe(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_telepipe"))
        .args(["--log-level", "error"])
        .args(args)
        .env_remove("TELEPIPE_LOG")
        .env_remove("TELEPIPE_CHANNEL_ID")
        .output()
        .expect("telepipe should run")
}

fn stdout_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be json"))
        .collect()
}

#[test]
fn encode_prints_wire_string() {
    let output = telepipe(&[
        "encode",
        "--account",
        "33",
        "--app",
        "2827902",
        "--id",
        "e8b91a159289ff74",
        "--transaction",
        "e8b91a159289ff74",
        "--sampled",
        "true",
        "--priority",
        "1.2",
        "--timestamp",
        "1618876800000",
    ]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), EXAMPLE);
}

#[test]
fn encode_rejects_empty_account() {
    let output = telepipe(&["encode", "--account", "", "--app", "2827902"]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn decode_reports_fields_as_json() {
    let output = telepipe(&["--format", "json", "decode", EXAMPLE, "--transport", "https"]);

    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    let payload = &lines[0];
    assert_eq!(payload["wire"], EXAMPLE);
    assert_eq!(payload["parent_type"], "App");
    assert_eq!(payload["parent_account_id"], "33");
    assert_eq!(payload["sampled"], true);
    assert_eq!(payload["priority"], 1.2);
    assert_eq!(payload["caller_transport_type"], "HTTPS");
}

#[test]
fn decode_keeps_absent_sampled_distinct() {
    let output = telepipe(&["--format", "json", "decode", "0-2-33-44-----1618876800000"]);

    assert!(output.status.success());
    let payload = &stdout_lines(&output)[0];
    assert!(payload["sampled"].is_null());
    assert!(payload["priority"].is_null());
    assert_eq!(payload["parent_type"], "Mobile");
}

#[test]
fn decode_rejects_missing_account() {
    let output = telepipe(&["decode", "0-0--2827902---1-1.2-1618876800000"]);

    assert_eq!(output.status.code(), Some(60));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("decode failed"));
}

#[test]
fn decode_rejects_malformed_integer() {
    let output = telepipe(&["decode", "x-0-33-2827902---1-1.2-1618876800000"]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn relay_delivers_child_batch_to_parent() {
    let output = telepipe(&[
        "--format",
        "json",
        "relay",
        "--channel-id",
        "7",
        "--endpoint",
        "custom_event_data",
        "--data",
        r#"[{"type":"Purchase","amount":3}]"#,
    ]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["endpoint"], "custom_event_data");
    assert_eq!(lines[0]["data"][0]["type"], "Purchase");
    assert_ne!(lines[0]["child_pid"], 0);
}

#[test]
fn relay_wraps_single_value_in_batch() {
    let output = telepipe(&[
        "--format",
        "json",
        "relay",
        "--endpoint",
        "error_data",
        "--data",
        r#"{"message":"boom"}"#,
    ]);

    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines[0]["data"], serde_json::json!([{"message": "boom"}]));
}

#[test]
fn relay_skips_empty_batch() {
    let output = telepipe(&["--format", "json", "relay", "--endpoint", "span_event_data"]);

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn relay_forwards_metric_data_even_when_empty() {
    let output = telepipe(&[
        "--format",
        "json",
        "relay",
        "--endpoint",
        "metric_data",
        "--data",
        "[]",
    ]);

    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["endpoint"], "metric_data");
    assert_eq!(lines[0]["data"], serde_json::json!([]));
}

#[test]
fn relay_with_unknown_channel_sends_nothing() {
    let output = telepipe(&[
        "--format",
        "json",
        "relay",
        "--channel-id",
        "1",
        "--lookup-id",
        "2",
        "--data",
        r#"[{"a":1}]"#,
    ]);

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn relay_rejects_invalid_data_json() {
    let output = telepipe(&["relay", "--data", "{not json"]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn version_reports_package_version() {
    let output = telepipe(&["version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("telepipe {}", env!("CARGO_PKG_VERSION"))
    );
}
