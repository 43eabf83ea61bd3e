//! CLI integration tests for the resilience binary
//!
//! These tests run the compiled binary and inspect its JSON output.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

/// Get a Command instance for the resilience binary
#[allow(deprecated)]
fn resilience_cmd() -> Command {
    Command::cargo_bin("resilience").expect("Failed to find resilience binary")
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

// ============================================================================
// --help / --version
// ============================================================================

#[test]
fn test_help_lists_subcommands() {
    resilience_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("classify"))
        .stdout(predicate::str::contains("decide"))
        .stdout(predicate::str::contains("fallback"))
        .stdout(predicate::str::contains("degrade"));
}

#[test]
fn test_version_flag() {
    resilience_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_subcommand_fails() {
    resilience_cmd().assert().failure();
}

// ============================================================================
// classify
// ============================================================================

#[test]
fn test_classify_status() {
    let output = resilience_cmd()
        .args(["-q", "classify", "--status", "429"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value = stdout_json(&output);
    assert_eq!(value["kind"], "rate-limited");
    assert_eq!(value["retryable"], true);
    assert_eq!(value["suggestedDelayMs"], 30000);
    assert_eq!(value["action"], "RETRY_WITH_BACKOFF");
}

#[test]
fn test_classify_fault_json_uses_status_code_field() {
    let output = resilience_cmd()
        .args([
            "classify",
            "--fault",
            r#"{"message":"rate limit hit","statusCode":403}"#,
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value = stdout_json(&output);
    assert_eq!(value["kind"], "auth-failure");
    assert_eq!(value["retryable"], false);
    assert!(value.get("suggestedDelayMs").is_none());
}

#[test]
fn test_classify_rejects_invalid_fault_json() {
    resilience_cmd()
        .args(["classify", "--fault", "{not json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--fault is not valid JSON"));
}

#[test]
fn test_classify_fault_conflicts_with_status() {
    resilience_cmd()
        .args(["classify", "--fault", "{}", "--status", "500"])
        .assert()
        .failure();
}

// ============================================================================
// decide
// ============================================================================

#[test]
fn test_decide_retry_with_seed_is_reproducible() {
    let run = || {
        let output = resilience_cmd()
            .args(["-q", "decide", "--status", "503", "--seed", "11"])
            .output()
            .unwrap();
        assert!(output.status.success());
        stdout_json(&output)
    };

    let first = run();
    let second = run();
    assert_eq!(first["action"], "RETRY");
    assert_eq!(first["nextAttempt"], 2);
    assert_eq!(first["delayMs"], second["delayMs"]);

    let delay = first["delayMs"].as_u64().unwrap();
    assert!((9_000..=11_000).contains(&delay), "{delay}");
}

#[test]
fn test_decide_fallback_from_builtin_chain() {
    let output = resilience_cmd()
        .args([
            "decide",
            "--message",
            "ETIMEDOUT",
            "--attempt",
            "3",
            "--max-attempts",
            "3",
            "--model",
            "gpt-4o",
            "--request-id",
            "req-1",
            "--node",
            "Draft",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value = stdout_json(&output);
    assert_eq!(value["success"], false);
    assert_eq!(value["action"], "USE_FALLBACK");
    assert_eq!(value["fallbackModel"], "gpt-4o-mini");
    assert_eq!(value["error"]["type"], "timeout");
    assert_eq!(value["error"]["context"]["request_id"], "req-1");
    assert_eq!(value["error"]["context"]["node_name"], "Draft");
}

#[test]
fn test_decide_continue_on_error() {
    let output = resilience_cmd()
        .args(["decide", "--status", "401", "--continue-on-error"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value = stdout_json(&output);
    assert_eq!(value["action"], "CONTINUE_WITH_ERROR");
    assert_eq!(value["retry"]["reason"], "not retryable");
}

#[test]
fn test_decide_with_config_file() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    writeln!(
        file,
        r#"
default_retries = 2

[model_fallbacks]
"local-model" = ["backup-model"]
"#
    )
    .unwrap();

    let output = resilience_cmd()
        .args(["decide", "--status", "500", "--attempt", "2", "--model", "local-model"])
        .arg("--config")
        .arg(file.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let value = stdout_json(&output);
    assert_eq!(value["retry"]["maxAttempts"], 2);
    assert_eq!(value["fallbackModel"], "backup-model");
}

#[test]
fn test_decide_missing_config_file_fails() {
    resilience_cmd()
        .args(["decide", "--status", "500", "--config", "/nonexistent/resilience.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

// ============================================================================
// fallback
// ============================================================================

#[test]
fn test_fallback_lookup() {
    let output = resilience_cmd()
        .args(["fallback", "claude-sonnet-4-20250514", "--tried", "1"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value = stdout_json(&output);
    assert_eq!(value["model"], "claude-sonnet-4-20250514");
    assert_eq!(value["tried"], 1);
    assert_eq!(value["fallback"], "gpt-4o");
}

#[test]
fn test_fallback_unknown_model_is_null() {
    let output = resilience_cmd()
        .args(["fallback", "no-such-model"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["fallback"], Value::Null);
}

// ============================================================================
// degrade
// ============================================================================

#[test]
fn test_degrade_known_scenario_echoes_context() {
    let output = resilience_cmd()
        .args([
            "degrade",
            "full-text-unavailable",
            "--context",
            r#"{"pmid":"123"}"#,
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value = stdout_json(&output);
    assert_eq!(value["applied"], true);
    assert_eq!(value["strategy"], "PROCEED_WITH_ABSTRACT");
    assert_eq!(value["flagForReview"], true);
    assert_eq!(value["context"]["pmid"], "123");
}

#[test]
fn test_degrade_unknown_scenario_exits_with_code_2() {
    resilience_cmd()
        .args(["degrade", "disk-full"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("\"applied\": false"))
        .stdout(predicate::str::contains("unknown scenario"));
}

#[test]
fn test_degrade_context_must_be_object() {
    resilience_cmd()
        .args(["degrade", "validation-failed", "--context", "[1,2]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be a JSON object"));
}
