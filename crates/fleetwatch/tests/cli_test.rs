//! Integration tests for the `fleetwatch` CLI binary.
//!
//! Every test runs against the simulated source with env isolation, so no
//! real machines or user configuration are involved.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `fleetwatch` binary with env isolation.
///
/// Clears `FLEETWATCH_*` overrides and points the config file at a
/// nonexistent path so tests never touch the user's real configuration.
/// Reboots complete immediately.
fn fleetwatch_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("fleetwatch");
    cmd.env("HOME", "/tmp/fleetwatch-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/fleetwatch-cli-test-nonexistent")
        .env(
            "FLEETWATCH_CONFIG",
            "/tmp/fleetwatch-cli-test-nonexistent/config.toml",
        )
        .env("FLEETWATCH_REBOOT__DELAY_SECS", "0")
        .env_remove("FLEETWATCH_OUTPUT")
        .env_remove("FLEETWATCH_ACTOR")
        .env_remove("FLEETWATCH_SOURCE__KIND")
        .env_remove("FLEETWATCH_SOURCE__SEED_FILE")
        .env_remove("RUST_LOG");
    cmd
}

/// Simulated fleet where every service starts online.
fn all_online_cmd() -> assert_cmd::Command {
    let mut cmd = fleetwatch_cmd();
    cmd.env("FLEETWATCH_SIMULATION__WARNING_WEIGHT", "0")
        .env("FLEETWATCH_SIMULATION__OFFLINE_WEIGHT", "0");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = fleetwatch_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    fleetwatch_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("server fleet")
            .and(predicate::str::contains("servers"))
            .and(predicate::str::contains("services"))
            .and(predicate::str::contains("reboot")),
    );
}

#[test]
fn test_version_flag() {
    fleetwatch_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fleetwatch"));
}

#[test]
fn test_completions_zsh() {
    fleetwatch_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_invalid_output_format() {
    let output = fleetwatch_cmd()
        .args(["--output", "invalid", "servers", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

// ── Servers ─────────────────────────────────────────────────────────

#[test]
fn test_servers_list_plain_names_the_default_fleet() {
    let output = fleetwatch_cmd()
        .args(["--seed", "7", "-o", "plain", "servers", "list"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let names: Vec<&str> = stdout.lines().collect();
    assert_eq!(names.len(), 10);
    assert!(names.contains(&"VXSQL1"));
    assert!(names.contains(&"VXDLR1"));
}

#[test]
fn test_servers_search_filters() {
    fleetwatch_cmd()
        .args(["-o", "plain", "servers", "list", "--search", "vxcati"])
        .assert()
        .success()
        .stdout(predicate::eq("VXCATI1\nVXCATI2\n"));
}

#[test]
fn test_unknown_server_exits_not_found() {
    fleetwatch_cmd()
        .args(["servers", "get", "GHOST"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("GHOST"));
}

#[test]
fn test_export_writes_inventory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fleet.json");
    fleetwatch_cmd()
        .args(["-q", "servers", "export"])
        .arg(&path)
        .assert()
        .success();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written.as_array().unwrap().len(), 10);

    // The export is itself a valid inventory.
    fleetwatch_cmd()
        .args(["-o", "plain", "servers", "list", "--seed-file"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("VXREPORT"));
}

// ── Services ────────────────────────────────────────────────────────

#[test]
fn test_stop_reports_transition() {
    let output = all_online_cmd()
        .args(["-o", "json", "services", "stop", "VXSQL1", "SQLAgent"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    insta::assert_json_snapshot!(stdout_json(&output), @r#"
    {
      "new": "offline",
      "old": "online",
      "result": "changed",
      "server": "VXSQL1",
      "service": "SQLAgent"
    }
    "#);
}

#[test]
fn test_start_on_online_service_is_unchanged() {
    let output = all_online_cmd()
        .args(["-o", "json", "services", "start", "VXSQL1", "W3SVC"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let result = stdout_json(&output);
    assert_eq!(result["result"], "unchanged");
    assert_eq!(result["status"], "online");
}

#[test]
fn test_unknown_service_exits_not_found() {
    fleetwatch_cmd()
        .args(["services", "restart", "VXSQL1", "Spooler"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("services list VXSQL1"));
}

#[test]
fn test_services_list_plain() {
    fleetwatch_cmd()
        .args(["-o", "plain", "services", "list", "VXCATI1"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("VoxcoBridgeService")
                .and(predicate::str::contains("VoxcoCATIService"))
                .and(predicate::str::contains("W3SVC")),
        );
}

// ── Reboot ──────────────────────────────────────────────────────────

#[test]
fn test_reboot_requires_yes_without_terminal() {
    fleetwatch_cmd()
        .args(["reboot", "VXDIAL1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--yes"));
}

#[test]
fn test_reboot_waits_for_recovery() {
    let output = fleetwatch_cmd()
        .args(["-y", "-o", "json", "reboot", "VXDIAL1"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let server = stdout_json(&output);
    assert_eq!(server["name"], "VXDIAL1");
    assert!(server["last_reboot"].is_string());
    for svc in server["services"].as_array().unwrap() {
        assert_ne!(svc["status"], "offline");
    }
}

#[test]
fn test_reboot_no_wait_reports_schedule() {
    let output = fleetwatch_cmd()
        .args(["-y", "-o", "json", "reboot", "VXDIAL2", "--no-wait"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let result = stdout_json(&output);
    assert_eq!(result["result"], "reboot_scheduled");
    assert_eq!(result["server"], "VXDIAL2");
}

// ── Stats ───────────────────────────────────────────────────────────

#[test]
fn test_stats_json_counts_whole_fleet() {
    let output = all_online_cmd()
        .args(["-o", "json", "stats"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stats = stdout_json(&output);
    assert_eq!(stats["total_servers"], 10);
    assert_eq!(stats["offline_services"], 0);
    assert_eq!(stats["uptime_percentage"], 100.0);
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_no_config() {
    fleetwatch_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ttl_secs = 60"));
}

#[test]
fn test_config_init_refuses_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    fleetwatch_cmd()
        .args(["-q", "config", "init", "--config"])
        .arg(&path)
        .assert()
        .success();
    assert!(path.exists());

    fleetwatch_cmd()
        .args(["config", "init", "--config"])
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_config_path_honours_flag() {
    fleetwatch_cmd()
        .args(["config", "path", "--config", "/tmp/elsewhere/fleet.toml"])
        .assert()
        .success()
        .stdout("/tmp/elsewhere/fleet.toml\n");
}

#[test]
fn test_live_source_without_inventory_is_usage_error() {
    fleetwatch_cmd()
        .args(["--source", "live", "servers", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("seed_file"));
}
