//! End-to-end pipeline tests against a mocked distribution bucket and a
//! mocked runner cache service. The "binary" served by the bucket is a shell
//! script standing in for pylon, so the installer subprocess really runs.
#![cfg(unix)]

use std::path::PathBuf;
use std::process::Command;

use sha2::{Digest, Sha256};
use tempfile::TempDir;

/// Stand-in pylon binary: `install` populates the home, `plugin` answers the
/// marketplace listing and logs every call, anything else fails.
const INSTALLER_SCRIPT: &str = r#"#!/bin/sh
case "$1" in
  install)
    mkdir -p "$PYLON_HOME/bin" "$PYLON_HOME/data"
    cp "$0" "$PYLON_HOME/bin/pylon"
    echo '{}' > "$PYLON_HOME/data/state.json"
    ;;
  plugin)
    if [ "$2 $3" = "marketplace list" ]; then
      echo '[]'
    fi
    echo "$@" >> "$PYLON_HOME/data/plugin-calls.log"
    ;;
  *)
    exit 7
    ;;
esac
exit 0
"#;

struct TestContext {
    temp_dir: TempDir,
    pylon_home: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let pylon_home = temp_dir.path().join(".pylon");

        Self {
            temp_dir,
            pylon_home,
        }
    }

    fn setup_cmd(&self, dist_url: &str) -> Command {
        let bin_path = env!("CARGO_BIN_EXE_setup-pylon");
        let mut cmd = Command::new(bin_path);
        cmd.env("HOME", self.temp_dir.path());
        cmd.env("PYLON_HOME", &self.pylon_home);
        cmd.env("PYLON_DIST_URL", dist_url);
        cmd.env("RUST_LOG", "setup_pylon=debug,pylon_dist=debug");
        cmd.env_remove("ACTIONS_CACHE_URL");
        cmd.env_remove("ACTIONS_RUNTIME_TOKEN");
        cmd.env_remove("GITHUB_PATH");
        cmd
    }
}

fn host_platform() -> String {
    pylon_dist::Platform::detect()
        .expect("supported host")
        .id()
        .to_string()
}

/// Register stable pointer, manifest, and binary mocks for one release.
fn mock_release(server: &mut mockito::Server, version: &str) -> Vec<mockito::Mock> {
    let platform = host_platform();
    let digest = hex::encode(Sha256::digest(INSTALLER_SCRIPT.as_bytes()));
    vec![
        server
            .mock("GET", "/stable")
            .with_body(format!("{version}\n"))
            .create(),
        server
            .mock("GET", format!("/{version}/manifest.json").as_str())
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"platforms": {{"{platform}": {{"checksum": "{digest}"}}}}}}"#
            ))
            .create(),
        server
            .mock("GET", format!("/{version}/{platform}/pylon").as_str())
            .with_body(INSTALLER_SCRIPT)
            .create(),
    ]
}

/// A gzipped tar shaped like a saved cache entry: `bin/` and `data/` entries
/// relative to the pylon home.
fn build_cache_archive() -> Vec<u8> {
    let staging = TempDir::new().unwrap();
    let bin = staging.path().join("bin");
    let data = staging.path().join("data");
    std::fs::create_dir_all(&bin).unwrap();
    std::fs::create_dir_all(&data).unwrap();
    std::fs::write(bin.join("pylon"), INSTALLER_SCRIPT).unwrap();
    std::fs::write(data.join("state.json"), b"{}").unwrap();

    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all("bin", &bin).unwrap();
    builder.append_dir_all("data", &data).unwrap();
    let encoder = builder.into_inner().unwrap();
    encoder.finish().unwrap()
}

#[test]
fn fresh_install_exports_path_and_configures_plugins() {
    let mut server = mockito::Server::new();
    let _release = mock_release(&mut server, "1.2.3");

    let ctx = TestContext::new();
    let github_path = ctx.temp_dir.path().join("github_path");
    let output = ctx
        .setup_cmd(&server.url())
        .env("GITHUB_PATH", &github_path)
        .args([
            "install",
            "--no-cache",
            "--marketplace",
            "owner/repo",
            "--plugin",
            "formatter",
        ])
        .output()
        .expect("failed to run setup-pylon install");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        output.status.success(),
        "stdout: {stdout}\nstderr: {stderr}"
    );
    assert!(stdout.contains("Installed pylon 1.2.3"), "stdout: {stdout}");

    // The installer populated the home.
    assert!(ctx.pylon_home.join("bin").join("pylon").exists());
    assert!(ctx.pylon_home.join("data").join("state.json").exists());

    // The bin directory was exported for later workflow steps.
    let path_export = std::fs::read_to_string(&github_path).unwrap();
    assert_eq!(
        path_export,
        format!("{}\n", ctx.pylon_home.join("bin").display())
    );

    // Marketplace and plugin calls went through the installed binary.
    let calls =
        std::fs::read_to_string(ctx.pylon_home.join("data").join("plugin-calls.log")).unwrap();
    let lines: Vec<&str> = calls.lines().collect();
    assert_eq!(
        lines,
        [
            "plugin marketplace list --json",
            "plugin marketplace add owner/repo",
            "plugin install formatter",
        ]
    );
}

#[test]
fn cache_hit_restores_without_touching_the_bucket() {
    let mut dist = mockito::Server::new();
    let untouched = dist
        .mock("GET", mockito::Matcher::Any)
        .expect(0)
        .create();

    let platform = host_platform();
    let key = format!("pylon-{platform}-1.0.0");

    let mut cache = mockito::Server::new();
    let entry = cache
        .mock("GET", "/_apis/artifactcache/cache")
        .match_query(mockito::Matcher::Any)
        .match_header("authorization", "Bearer test-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"cacheKey": "{key}", "archiveLocation": "{}/blob"}}"#,
            cache.url()
        ))
        .create();
    let blob = cache.mock("GET", "/blob").with_body(build_cache_archive()).create();

    let ctx = TestContext::new();
    let output = ctx
        .setup_cmd(&dist.url())
        .env("ACTIONS_CACHE_URL", cache.url())
        .env("ACTIONS_RUNTIME_TOKEN", "test-token")
        .args(["install", "1.0.0"])
        .output()
        .expect("failed to run setup-pylon install");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        output.status.success(),
        "stdout: {stdout}\nstderr: {stderr}"
    );
    assert!(
        stdout.contains(&format!("Restored pylon from cache ({key})")),
        "stdout: {stdout}"
    );
    assert!(ctx.pylon_home.join("bin").join("pylon").exists());
    assert!(ctx.pylon_home.join("data").join("state.json").exists());

    entry.assert();
    blob.assert();
    untouched.assert();
}

#[test]
fn fresh_install_saves_back_under_the_resolved_stable_key() {
    let mut server = mockito::Server::new();
    let _release = mock_release(&mut server, "1.2.3");
    let platform = host_platform();

    let miss = server
        .mock("GET", "/_apis/artifactcache/cache")
        .match_query(mockito::Matcher::Any)
        .with_status(204)
        .create();
    let reserve = server
        .mock("POST", "/_apis/artifactcache/caches")
        .match_body(mockito::Matcher::PartialJsonString(format!(
            r#"{{"key": "pylon-{platform}-1.2.3"}}"#
        )))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"cacheId": 17}"#)
        .create();
    let upload = server
        .mock("PATCH", "/_apis/artifactcache/caches/17")
        .with_status(204)
        .create();
    let commit = server
        .mock("POST", "/_apis/artifactcache/caches/17")
        .with_status(200)
        .create();

    let ctx = TestContext::new();
    let output = ctx
        .setup_cmd(&server.url())
        .env("ACTIONS_CACHE_URL", server.url())
        .env("ACTIONS_RUNTIME_TOKEN", "test-token")
        .arg("install")
        .output()
        .expect("failed to run setup-pylon install");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        output.status.success(),
        "stdout: {stdout}\nstderr: {stderr}"
    );
    assert!(stdout.contains("Installed pylon 1.2.3"), "stdout: {stdout}");

    miss.assert();
    reserve.assert();
    upload.assert();
    commit.assert();
}

#[test]
fn missing_runner_cache_degrades_to_a_warning() {
    let mut server = mockito::Server::new();
    let _release = mock_release(&mut server, "1.2.3");

    let ctx = TestContext::new();
    // No ACTIONS_CACHE_URL / ACTIONS_RUNTIME_TOKEN and no --no-cache.
    let output = ctx
        .setup_cmd(&server.url())
        .arg("install")
        .output()
        .expect("failed to run setup-pylon install");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout: {stdout}");
    assert!(
        stdout.contains("Runner cache unavailable"),
        "stdout: {stdout}"
    );
    assert!(stdout.contains("Installed pylon 1.2.3"), "stdout: {stdout}");
}

#[test]
fn checksum_mismatch_aborts_the_install() {
    let mut server = mockito::Server::new();
    let platform = host_platform();
    // Manifest advertises the digest of different bytes.
    let wrong_digest = hex::encode(Sha256::digest(b"something else entirely"));

    server.mock("GET", "/stable").with_body("1.2.3\n").create();
    server
        .mock("GET", "/1.2.3/manifest.json")
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"platforms": {{"{platform}": {{"checksum": "{wrong_digest}"}}}}}}"#
        ))
        .create();
    server
        .mock("GET", format!("/1.2.3/{platform}/pylon").as_str())
        .with_body(INSTALLER_SCRIPT)
        .create();

    let ctx = TestContext::new();
    let output = ctx
        .setup_cmd(&server.url())
        .args(["install", "--no-cache"])
        .output()
        .expect("failed to run setup-pylon install");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Checksum mismatch"), "stderr: {stderr}");
    assert!(!ctx.pylon_home.join("bin").exists(), "nothing installed");
}

#[test]
fn missing_manifest_entry_never_downloads_the_binary() {
    let mut server = mockito::Server::new();
    let platform = host_platform();

    server.mock("GET", "/stable").with_body("1.2.3\n").create();
    server
        .mock("GET", "/1.2.3/manifest.json")
        .with_header("content-type", "application/json")
        .with_body(r#"{"platforms": {"solaris-sparc": {"checksum": "0000000000000000000000000000000000000000000000000000000000000000"}}}"#)
        .create();
    let binary = server
        .mock("GET", format!("/1.2.3/{platform}/pylon").as_str())
        .expect(0)
        .create();

    let ctx = TestContext::new();
    let output = ctx
        .setup_cmd(&server.url())
        .args(["install", "--no-cache"])
        .output()
        .expect("failed to run setup-pylon install");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("No manifest entry for platform"),
        "stderr: {stderr}"
    );
    binary.assert();
}
