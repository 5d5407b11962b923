//! file: core/tests/resolver_scenarios.rs
//! description: the resolver's scenario coverage (`resolver.rs`'s colocated
//! unit tests), re-run end-to-end through `PackageManager::reload` against
//! real descriptor files and, where a remote package is needed, a wiremock
//! manifest server.

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use backstage_core::config::Config;
use backstage_core::platform::{Arch, Os, Platform};
use backstage_core::PackageManager;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn zip_with_descriptor(name: &str, extension: &str, body: &serde_json::Value) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(Cursor::new(&mut buf));
        let options: zip::write::FileOptions<()> = zip::write::FileOptions::default();
        writer.start_file(format!("{name}.{extension}"), options).unwrap();
        writer.write_all(body.to_string().as_bytes()).unwrap();
        writer.finish().unwrap();
    }
    buf
}

fn config_in(dir: &Path, repos: Vec<Url>) -> Config {
    Config::new(dir.to_path_buf())
        .with_platform(Platform::new(Os::Linux, Arch::X86_64))
        .with_repositories(repos)
}

fn write_plugin(dir: &Path, name: &str, lang: &str, deps: &[serde_json::Value]) {
    let body = serde_json::json!({
        "fileVersion": 1,
        "version": 0,
        "friendlyName": name,
        "entryPoint": name,
        "languageModule": { "name": lang },
        "dependencies": deps,
    });
    fs::write(dir.join(format!("{name}.plugin")), body.to_string()).unwrap();
}

fn write_module(dir: &Path, name: &str, lang: &str, version: i64) {
    let body = serde_json::json!({
        "fileVersion": 1,
        "version": version,
        "friendlyName": name,
        "language": lang,
    });
    fs::write(dir.join(format!("{name}.module")), body.to_string()).unwrap();
}

fn manifest_body(name: &str, kind: &str, versions: &[i64]) -> serde_json::Value {
    serde_json::json!({
        "content": {
            name: {
                "name": name,
                "type": kind,
                "versions": versions.iter().map(|v| serde_json::json!({
                    "version": v,
                    "download": "https://example.test/pkg.zip",
                    "platforms": [] as [&str; 0],
                })).collect::<Vec<_>>(),
            }
        }
    })
}

#[tokio::test]
async fn scenario_1_single_plugin_with_local_module_resolves_cleanly() {
    let base = TempDir::new().unwrap();
    write_module(base.path(), "modA", "lua", 0);
    write_plugin(base.path(), "pluginA", "lua", &[]);

    let mut pm = PackageManager::new(config_in(base.path(), vec![]));
    pm.reload().await;

    assert!(pm.missing().is_empty());
    assert!(pm.conflicted().is_empty());
}

#[tokio::test]
async fn scenario_2_missing_language_module_is_recorded_as_a_remote_requirement() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(manifest_body("modPy", "py", &[3])))
        .mount(&server)
        .await;

    let base = TempDir::new().unwrap();
    write_plugin(base.path(), "pluginA", "py", &[]);

    let repos = vec![Url::parse(&server.uri()).unwrap()];
    let mut pm = PackageManager::new(config_in(base.path(), repos));
    pm.reload().await;

    assert!(pm.conflicted().is_empty());
    assert!(pm.missing().contains_key("modPy"));
    assert_eq!(pm.missing()["modPy"].requested_version, None);
}

#[tokio::test]
async fn scenario_2_install_missing_then_reload_resolves_the_plugin() {
    let manifest_server = MockServer::start().await;
    let download_server = MockServer::start().await;

    let mut manifest = manifest_body("modPy", "py", &[3]);
    manifest["content"]["modPy"]["versions"][0]["download"] =
        serde_json::Value::String(download_server.uri());
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(manifest))
        .mount(&manifest_server)
        .await;

    let module_descriptor = serde_json::json!({
        "fileVersion": 1,
        "version": 3,
        "friendlyName": "modPy",
        "language": "py",
    });
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(zip_with_descriptor(
            "modPy",
            "module",
            &module_descriptor,
        )))
        .mount(&download_server)
        .await;

    let base = TempDir::new().unwrap();
    write_plugin(base.path(), "pluginA", "py", &[]);

    let repos = vec![Url::parse(&manifest_server.uri()).unwrap()];
    let mut pm = PackageManager::new(config_in(base.path(), repos));
    pm.reload().await;
    assert!(pm.missing().contains_key("modPy"));

    let installed = pm.install_missing().await;
    assert_eq!(installed, 1, "the missing module must resolve to the real remote package and install");

    pm.reload().await;
    assert!(pm.missing().is_empty());
    assert!(pm.conflicted().is_empty());
    assert!(base.path().join("modules").join("modPy").join("modPy.module").exists());
}

#[tokio::test]
async fn scenario_3_version_pin_mismatch_against_local_dependency_is_advisory_only() {
    let base = TempDir::new().unwrap();
    write_module(base.path(), "modA", "lua", 0);
    write_module(base.path(), "modB", "lua", 2);
    write_plugin(
        base.path(),
        "pluginA",
        "lua",
        &[serde_json::json!({ "name": "modB", "requestedVersion": 5 })],
    );

    let mut pm = PackageManager::new(config_in(base.path(), vec![]));
    pm.reload().await;

    assert!(pm.conflicted().is_empty());
    assert!(!pm.missing().contains_key("modB"));
}

#[tokio::test]
async fn remote_dependency_with_unsatisfiable_pin_is_conflicted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(manifest_body(
            "modB",
            "lua",
            &[3, 4, 7],
        )))
        .mount(&server)
        .await;

    let base = TempDir::new().unwrap();
    write_module(base.path(), "modA", "lua", 0);
    write_plugin(
        base.path(),
        "pluginA",
        "lua",
        &[serde_json::json!({ "name": "modB", "requestedVersion": 5 })],
    );

    let repos = vec![Url::parse(&server.uri()).unwrap()];
    let mut pm = PackageManager::new(config_in(base.path(), repos));
    pm.reload().await;

    assert_eq!(pm.conflicted().to_vec(), vec!["pluginA".to_string()]);
    assert!(!pm.missing().contains_key("modB"));
}

#[tokio::test]
async fn optional_dependency_that_cannot_resolve_does_not_conflict() {
    let base = TempDir::new().unwrap();
    write_module(base.path(), "modA", "lua", 0);
    write_plugin(
        base.path(),
        "pluginA",
        "lua",
        &[serde_json::json!({ "name": "modB", "optional": true })],
    );

    let mut pm = PackageManager::new(config_in(base.path(), vec![]));
    pm.reload().await;

    assert!(pm.conflicted().is_empty());
    assert!(pm.missing().is_empty());
}
