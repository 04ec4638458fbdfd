#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::Value;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "rsl-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rsocket-lifecycle"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .output()
        .expect("cli should run")
}

fn simulate(tag: &str, scenario: &str, extra: &[&str]) -> (Output, PathBuf) {
    let dir = unique_temp_dir(tag);
    let path = dir.join("scenario.json");
    std::fs::write(&path, scenario).expect("scenario should be writable");

    let path_arg = path.to_string_lossy().into_owned();
    let mut args = vec!["--format", "json", "simulate", path_arg.as_str()];
    args.extend_from_slice(extra);
    (cli(&args), dir)
}

fn report(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn simulate_inbound_payload_then_completion() {
    let (output, dir) = simulate(
        "inbound",
        r#"{"steps": [
            {"action": "payload", "data": "hello"},
            {"action": "payload", "next": false, "complete": true}
        ]}"#,
        &[],
    );
    let report = report(&output);

    let first = &report["steps"][1]["events"];
    assert_eq!(first[0]["direction"], "received");
    assert_eq!(first[0]["kind"], "next");
    assert_eq!(first[0]["detail"], "data=hello");
    assert_eq!(report["steps"][2]["events"][0]["kind"], "complete");
    assert_eq!(report["outcome"]["incoming_finished"], true);
    assert_eq!(report["outcome"]["outgoing_finished"], false);
    assert_eq!(report["outcome"]["joined"], false);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn simulate_requester_exchange_with_initial_request_override() {
    let (output, dir) = simulate(
        "requester",
        r#"{"stream_id": 3, "steps": [
            {"action": "produce_next", "data": "a"},
            {"action": "produce_complete"},
            {"action": "payload", "data": "b", "complete": true}
        ]}"#,
        &["--initial-request", "4"],
    );
    let report = report(&output);

    assert_eq!(report["stream_id"], 3);
    assert_eq!(report["steps"][1]["events"][0]["kind"], "PAYLOAD");
    assert_eq!(
        report["steps"][2]["events"][0]["detail"],
        "next=false complete=true data="
    );
    assert_eq!(report["outcome"]["producer_requested"], 4);
    assert_eq!(report["outcome"]["joined"], true);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn simulate_producer_error_notifies_both_sides() {
    let (output, dir) = simulate(
        "producer-error",
        r#"{"steps": [
            {"action": "request_n", "n": 1},
            {"action": "produce_error", "message": "boom"}
        ]}"#,
        &[],
    );
    let report = report(&output);

    let events = report["steps"][2]["events"]
        .as_array()
        .expect("events should be an array");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["kind"], "ERROR");
    assert_eq!(events[0]["detail"], "code=APPLICATION_ERROR (0x0201) message=boom");
    assert_eq!(events[1]["kind"], "error");
    assert!(events[1]["detail"]
        .as_str()
        .unwrap_or_default()
        .ends_with("(cancellation)"));
    assert_eq!(report["outcome"]["joined"], true);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn simulate_invalid_frame_returns_60() {
    let (output, dir) = simulate(
        "zero-credit",
        r#"{"steps": [{"action": "request_n", "n": 0}]}"#,
        &[],
    );
    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("step 1 (request_n)"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn simulate_malformed_scenario_returns_60() {
    let (output, dir) = simulate("malformed", r#"{"steps": [{"action": "warp"}]}"#, &[]);
    assert_eq!(output.status.code(), Some(60));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn simulate_missing_file_returns_1() {
    let dir = unique_temp_dir("missing");
    let path = dir.join("absent.json");
    let path_arg = path.to_string_lossy().into_owned();
    let output = cli(&["simulate", path_arg.as_str()]);
    assert_eq!(output.status.code(), Some(1));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn usage_error_returns_64() {
    let output = cli(&["simulate"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn codes_lists_the_table() {
    let output = cli(&["--format", "json", "codes"]);
    let codes = report(&output);
    let codes = codes.as_array().expect("codes should be an array");
    assert_eq!(codes.len(), 10);
    assert!(codes
        .iter()
        .any(|c| c["name"] == "CANCELED" && c["hex"] == "0x0203" && c["scope"] == "stream"));
}

#[test]
fn version_prints_crate_version() {
    let output = cli(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("rsocket-lifecycle {}", env!("CARGO_PKG_VERSION"))
    );
}
