use std::fs;
use std::path::PathBuf;

use predicates::prelude::predicate;
use serde_json::{Value, json};
use tempfile::tempdir;

fn write_exec_script(path: &PathBuf, body: &str) {
    fs::write(path, body).expect("write script");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod");
    }
}

/// Fake `xh` that logs its arguments and prints a canned JSON response.
fn create_xh_shim(dir: &std::path::Path) -> (PathBuf, PathBuf) {
    let xh_path = dir.join("fake-xh");
    let log_path = dir.join("xh-args.log");
    write_exec_script(
        &xh_path,
        &format!(
            r#"#!/bin/sh
for arg in "$@"; do echo "$arg" >> "{log}"; done
printf 'HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nX-Trace: t-1\r\n\r\n'
printf '{{"items":[{{"id":1,"tags":["a"]}},{{"id":2,"tags":["b","c"]}}],"meta":null}}'
"#,
            log = log_path.display()
        ),
    );
    (xh_path, log_path)
}

fn write_rules(dir: &std::path::Path, rules: Value) -> PathBuf {
    let path = dir.join("rules.json");
    fs::write(&path, rules.to_string()).expect("write rules");
    path
}

#[cfg(unix)]
#[test]
fn check_passes_against_xh_response() {
    let dir = tempdir().expect("tempdir");
    let (xh_bin, log_path) = create_xh_shim(dir.path());
    let config_path = dir.path().join("expectq.toml");
    fs::write(
        &config_path,
        "base_url = \"https://api.example.test\"\n\n[headers]\nauthorization = \"Bearer t\"\n",
    )
    .expect("write config");
    let rules = write_rules(
        dir.path(),
        json!({
            "request": {"method": "GET", "url": "/items"},
            "expectations": [
                {"kind": "status", "expected": 200},
                {"kind": "json_types", "path": "items.*.id", "expected": "integer"},
                {"kind": "json", "path": "items.*.tags.?", "expected": {"$regex": "^[a-c]$"}},
                {"kind": "json", "path": "meta.?.extra", "optional": true, "expected": 1},
                {"kind": "header", "path": "x-trace", "expected": "t-1"}
            ]
        }),
    );

    let output = assert_cmd::cargo::cargo_bin_cmd!("expectq")
        .env("EXPECTQ_XH_BIN", &xh_bin)
        .arg("check")
        .arg("--rules")
        .arg(&rules)
        .arg("--config")
        .arg(&config_path)
        .output()
        .expect("run check");

    assert_eq!(output.status.code(), Some(0));
    let report: Value = serde_json::from_slice(&output.stdout).expect("stdout json");
    assert_eq!(report["matched"], Value::Bool(true));
    assert_eq!(report["failure_count"], json!(0));
    assert_eq!(report["results"].as_array().map(Vec::len), Some(5));
    assert!(output.stderr.is_empty());

    let logged = fs::read_to_string(&log_path).expect("xh args log");
    let logged: Vec<&str> = logged.lines().collect();
    assert!(logged.contains(&"GET"));
    assert!(logged.contains(&"https://api.example.test/items"));
    assert!(logged.contains(&"authorization:Bearer t"));
    assert!(logged.contains(&"--follow"));
}

#[cfg(unix)]
#[test]
fn check_failure_returns_exit_two_with_diagnostics() {
    let dir = tempdir().expect("tempdir");
    let (xh_bin, _log_path) = create_xh_shim(dir.path());
    let rules = write_rules(
        dir.path(),
        json!({
            "request": {"url": "https://api.example.test/items"},
            "expectations": [
                {"kind": "json", "path": "items.*.id", "expected": 1}
            ]
        }),
    );

    let output = assert_cmd::cargo::cargo_bin_cmd!("expectq")
        .env("EXPECTQ_XH_BIN", &xh_bin)
        .arg("check")
        .arg("--rules")
        .arg(&rules)
        .output()
        .expect("run check");

    assert_eq!(output.status.code(), Some(2));
    let report: Value = serde_json::from_slice(&output.stdout).expect("stdout json");
    assert_eq!(report["matched"], Value::Bool(false));
    let message = report["results"][0]["message"].as_str().expect("message");
    assert!(message.contains("1 of 2 elements in `items.*.id` did not match"));
    assert!(message.contains("expect arguments: [\"items.*.id\",1]"));
    assert!(message.contains("failed element: 2"));
    assert!(message.contains("REQUEST: GET https://api.example.test/items"));
    assert!(message.contains("JSON_BODY"));
}

#[test]
fn check_with_recorded_response_does_not_need_xh() {
    let dir = tempdir().expect("tempdir");
    let rules = write_rules(
        dir.path(),
        json!({
            "expectations": [
                {"kind": "json", "path": "data.?.name", "expected": "b"},
                {"kind": "header_types", "expected": {"content-type": "string"}}
            ]
        }),
    );
    let recorded = dir.path().join("response.http");
    fs::write(
        &recorded,
        "HTTP/1.1 200 OK\nContent-Type: application/json\n\n{\"data\":[{\"name\":\"a\"},{\"name\":\"b\"}]}",
    )
    .expect("write response");

    assert_cmd::cargo::cargo_bin_cmd!("expectq")
        .env("EXPECTQ_XH_BIN", "/definitely-missing/xh")
        .arg("check")
        .arg("--rules")
        .arg(&rules)
        .arg("--response")
        .arg(&recorded)
        .assert()
        .code(0)
        .stdout(predicate::str::contains(r#""matched":true"#))
        .stderr(predicate::str::is_empty());
}

#[test]
fn missing_xh_maps_to_exit_three() {
    let dir = tempdir().expect("tempdir");
    let rules = write_rules(
        dir.path(),
        json!({
            "request": {"url": "https://api.example.test/items"},
            "expectations": []
        }),
    );

    let output = assert_cmd::cargo::cargo_bin_cmd!("expectq")
        .env("EXPECTQ_XH_BIN", "/definitely-missing/xh")
        .arg("check")
        .arg("--rules")
        .arg(&rules)
        .output()
        .expect("run check");

    assert_eq!(output.status.code(), Some(3));
    assert!(output.stdout.is_empty());
    let stderr: Value = serde_json::from_slice(&output.stderr).expect("stderr json");
    assert_eq!(stderr["error"], Value::from("input_usage_error"));
    assert_eq!(stderr["code"], Value::from(3));
    assert_eq!(stderr["details"]["command"], Value::from("check"));
    assert_eq!(
        stderr["message"],
        Value::from("request failed: `xh` is not available in PATH")
    );
}

#[test]
fn invalid_config_maps_to_exit_three() {
    let dir = tempdir().expect("tempdir");
    let rules = write_rules(dir.path(), json!({"expectations": []}));
    let config_path = dir.path().join("expectq.toml");
    fs::write(&config_path, "retries = 3\n").expect("write config");

    assert_cmd::cargo::cargo_bin_cmd!("expectq")
        .arg("check")
        .arg("--rules")
        .arg(&rules)
        .arg("--config")
        .arg(&config_path)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("invalid config file"));
}

#[test]
fn unreadable_rules_map_to_exit_three() {
    let dir = tempdir().expect("tempdir");
    assert_cmd::cargo::cargo_bin_cmd!("expectq")
        .arg("check")
        .arg("--rules")
        .arg(dir.path().join("missing.json"))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("failed to open rules file"));
}
