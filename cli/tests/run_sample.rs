//! file: cli/tests/run_sample.rs
//! description: end-to-end `backstage` CLI runs against a real temp
//! `--base-dir`, no network repositories.

use std::fs;

use assert_cmd::Command;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::cargo_bin("backstage").unwrap()
}

fn write_plugin(dir: &std::path::Path, name: &str) {
    let body = serde_json::json!({
        "fileVersion": 1,
        "version": 1,
        "friendlyName": name,
        "entryPoint": name,
        "languageModule": { "name": "lua" },
    });
    fs::write(dir.join(format!("{name}.plugin")), body.to_string()).unwrap();
}

#[test]
fn list_on_an_empty_base_dir_succeeds_with_no_rows() {
    let base = TempDir::new().unwrap();
    cmd()
        .args(["--base-dir", base.path().to_str().unwrap(), "list"])
        .assert()
        .success();
}

#[test]
fn resolve_reports_zero_missing_and_conflicted_for_a_clean_tree() {
    let base = TempDir::new().unwrap();
    write_plugin(base.path(), "pluginA");
    fs::write(
        base.path().join("lua.module"),
        serde_json::json!({
            "fileVersion": 1,
            "version": 1,
            "friendlyName": "lua",
            "language": "lua",
        })
        .to_string(),
    )
    .unwrap();

    let assert = cmd()
        .args(["--base-dir", base.path().to_str().unwrap(), "resolve"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(!stdout.contains("missing:"), "unexpected missing entry: {stdout}");
}

#[test]
fn snapshot_writes_a_pmanifest_file_for_the_discovered_packages() {
    let base = TempDir::new().unwrap();
    write_plugin(base.path(), "pluginA");
    let out = base.path().join("state.pmanifest");

    cmd()
        .args([
            "--base-dir",
            base.path().to_str().unwrap(),
            "snapshot",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();

    let doc: serde_json::Value = serde_json::from_slice(&fs::read(&out).unwrap()).unwrap();
    assert!(doc["content"]["pluginA"].is_object());
}

#[test]
fn uninstalling_a_package_that_does_not_exist_fails() {
    let base = TempDir::new().unwrap();
    cmd()
        .args(["--base-dir", base.path().to_str().unwrap(), "uninstall", "ghost"])
        .assert()
        .failure();
}
