//! CLI integration tests.
//!
//! Uses `assert_cmd` to spawn the `libswap` binary and verify exit codes,
//! stdout content and stderr content. Projects are written to scratch
//! directories.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn libswap() -> Command {
    let mut cmd = cargo_bin_cmd!("libswap");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_project(root: &Path, name: &str, unit: serde_json::Value) -> PathBuf {
    let project = root.join(name);
    fs::create_dir_all(&project).unwrap();
    let class = unit["class"].as_str().unwrap().to_string();
    fs::write(
        project.join(format!("{}.unit.json", class)),
        serde_json::to_string_pretty(&unit).unwrap(),
    )
    .unwrap();
    project
}

fn http_project(root: &Path) -> PathBuf {
    write_project(
        root,
        "app",
        json!({
            "imports": ["org.apache.http.client.methods.HttpGet"],
            "class": "Fetcher",
            "functions": [{
                "name": "fetch",
                "params": [
                    {"type": "CloseableHttpClient", "name": "client"},
                    {"type": "String", "name": "url"}
                ],
                "body": [
                    {"kind": "local", "type": "HttpGet", "name": "request",
                     "init": {"kind": "new", "type": "HttpGet", "args": [{"kind": "name", "name": "url"}]}},
                    {"kind": "expr", "expr": {"kind": "call", "receiver": {"kind": "name", "name": "request"},
                     "method": "setHeader",
                     "args": [{"kind": "literal", "value": "\"X\""}, {"kind": "literal", "value": "\"1\""}]}},
                    {"kind": "return", "value": {"kind": "call", "receiver": {"kind": "name", "name": "client"},
                     "method": "execute", "args": [{"kind": "name", "name": "request"}]}}
                ]
            }]
        }),
    )
}

fn graph_project(root: &Path) -> PathBuf {
    write_project(
        root,
        "walker",
        json!({
            "class": "Walker",
            "functions": [{
                "name": "walk",
                "params": [{"type": "Node2", "name": "node"}],
                "body": [
                    {"kind": "local", "type": "Node2", "name": "up",
                     "init": {"kind": "call", "receiver": {"kind": "name", "name": "node"},
                              "method": "getParentNode"}},
                    {"kind": "local", "type": "List<Node2>", "name": "all",
                     "init": {"kind": "call", "receiver": {"kind": "name", "name": "node"},
                              "method": "getNodeList"}}
                ]
            }]
        }),
    )
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    libswap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Migrate programs between libraries with equivalent APIs",
        ));
}

#[test]
fn version_exits_0() {
    libswap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("libswap"));
}

#[test]
fn migrate_help_lists_policy() {
    libswap()
        .args(["migrate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--policy"));
}

// ──────────────────────────────────────────────
// 2. Libraries and describe
// ──────────────────────────────────────────────

#[test]
fn libraries_lists_catalog() {
    libswap()
        .arg("libraries")
        .assert()
        .success()
        .stdout(predicate::str::contains("okhttp"))
        .stdout(predicate::str::contains("slf4j"));
}

#[test]
fn libraries_json_is_an_array() {
    let out = libswap()
        .args(["--output", "json", "libraries"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value.as_array().unwrap().len(), 7);
}

#[test]
fn describe_shows_roles_and_transitions() {
    libswap()
        .args(["describe", "okhttp"])
        .assert()
        .success()
        .stdout(predicate::str::contains("role Request : okhttp3.Request.Builder"))
        .stdout(predicate::str::contains("--addHeader()--> Request.hasURL [SetHeader]"));
}

#[test]
fn describe_json_carries_library_name() {
    let out = libswap()
        .args(["describe", "slf4j", "--output", "json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["name"], "slf4j");
}

#[test]
fn describe_unknown_library_exits_1() {
    libswap()
        .args(["describe", "curl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("curl"));
}

#[test]
fn describe_reads_declaration_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("tiny.json");
    fs::write(
        &path,
        serde_json::to_string(&json!({
            "library": "tiny",
            "constructs": [
                {"kind": "Type", "role": "Thing", "type": "x.Thing"},
                {"kind": "Automaton", "role": "Thing",
                 "shifts": [{"from": "Init", "to": "Constructed", "functions": ["make"]}]},
                {"kind": "Function", "role": "Thing", "name": "make", "static": true, "returns_value": true}
            ]
        }))
        .unwrap(),
    )
    .unwrap();
    libswap()
        .args(["describe", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("library tiny"))
        .stdout(predicate::str::contains("--make()--> Thing.Constructed"));
}

// ──────────────────────────────────────────────
// 3. Route
// ──────────────────────────────────────────────

#[test]
fn route_finds_header_call() {
    libswap()
        .args([
            "route",
            "okhttp",
            "--require",
            "SetHeader",
            "--start",
            "Request.hasURL",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("--addHeader()-->"));
}

#[test]
fn route_json_lists_methods() {
    let out = libswap()
        .args([
            "--output",
            "json",
            "route",
            "log4j",
            "--require",
            "LoggerName",
            "--goal",
            "Logger.Constructed",
        ])
        .output()
        .unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["methods"], json!(["getLogger"]));
    assert!(value["explored"].as_u64().unwrap() >= 1);
}

#[test]
fn route_not_found_exits_1() {
    libswap()
        .args(["route", "log4j", "--require", "Teleport"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("route not found"));
}

#[test]
fn route_rejects_malformed_state() {
    libswap()
        .args(["route", "okhttp", "--goal", "Nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected Role.State"));
}

// ──────────────────────────────────────────────
// 4. Migrate
// ──────────────────────────────────────────────

#[test]
fn migrate_writes_copy_and_summary() {
    let tmp = TempDir::new().unwrap();
    let project = http_project(tmp.path());
    let out = tmp.path().join("out");
    libswap()
        .args(["migrate", project.to_str().unwrap(), "--from", "apache", "--to", "okhttp"])
        .args(["--out", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Migrated 3 usage(s) from apache to okhttp in 1 file(s)"));

    let java = fs::read_to_string(out.join("Fetcher.java")).unwrap();
    assert!(java.contains("request.addHeader(\"X\", \"1\");"));
    assert!(java.contains("return client.newCall(request.build()).execute();"));
    assert!(!project.join("Fetcher.java").exists());
}

#[test]
fn migrate_default_output_location() {
    let tmp = TempDir::new().unwrap();
    let project = http_project(tmp.path());
    libswap()
        .args(["migrate", project.to_str().unwrap(), "--from", "apache", "--to", "okhttp"])
        .assert()
        .success();
    assert!(tmp
        .path()
        .join("migrated/app_migrated_apache_okhttp/Fetcher.java")
        .is_file());
}

#[test]
fn migrate_json_report() {
    let tmp = TempDir::new().unwrap();
    let project = http_project(tmp.path());
    let out = libswap()
        .args(["--output", "json", "migrate", project.to_str().unwrap()])
        .args(["--from", "apache", "--to", "okhttp"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["success"], true);
    assert_eq!(value["report"]["usages_migrated"], 3);
    assert_eq!(value["report"]["files"][0]["path"], "Fetcher.unit.json");
}

#[test]
fn best_effort_reports_skipped_usages_and_exits_1() {
    let tmp = TempDir::new().unwrap();
    let project = graph_project(tmp.path());
    libswap()
        .args(["migrate", project.to_str().unwrap(), "--from", "graph2", "--to", "graph1"])
        .args(["--policy", "best-effort"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("1 usage(s) left unchanged"))
        .stdout(predicate::str::contains("MakeArray"));
}

#[test]
fn all_or_nothing_stops_with_diagnostic() {
    let tmp = TempDir::new().unwrap();
    let project = graph_project(tmp.path());
    libswap()
        .args(["migrate", project.to_str().unwrap(), "--from", "graph2", "--to", "graph1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot replay MakeArray transition"));
}

#[test]
fn config_file_policy_is_used() {
    let tmp = TempDir::new().unwrap();
    let project = graph_project(tmp.path());
    fs::write(project.join("libswap.toml"), "policy = \"best-effort\"\n").unwrap();
    libswap()
        .args(["migrate", project.to_str().unwrap(), "--from", "graph2", "--to", "graph1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("left unchanged"));
}

#[test]
fn verification_failure_exits_1() {
    let tmp = TempDir::new().unwrap();
    let project = http_project(tmp.path());
    libswap()
        .args(["migrate", project.to_str().unwrap(), "--from", "apache", "--to", "okhttp"])
        .args(["--verify", "echo 'compile error' >&2; exit 1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("verification failed"))
        .stderr(predicate::str::contains("compile error"));
}

#[test]
fn incompatible_libraries_json_error() {
    let tmp = TempDir::new().unwrap();
    let project = http_project(tmp.path());
    libswap()
        .args(["--output", "json", "migrate", project.to_str().unwrap()])
        .args(["--from", "apache", "--to", "slf4j"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error\""))
        .stderr(predicate::str::contains("model different APIs"));
}

#[test]
fn missing_project_exits_1() {
    libswap()
        .args(["migrate", "/nonexistent/project", "--from", "apache", "--to", "okhttp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("project directory not found"));
}
