//! End-to-end tests for the command line interface

#![cfg(unix)]

mod common;

use assert_cmd::Command;
use common::{TestWorkspace, engine};
use predicates::prelude::*;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("kodegen_bundler_pkg").unwrap();
    cmd.env_remove("KODEGEN_PKG_ENGINE");
    cmd
}

fn json(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).unwrap()
}

#[test]
fn lists_builtin_presets() {
    cli()
        .arg("--list-presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("Microsoft Teams Custom Backgrounds"));
}

#[test]
fn lists_presets_as_json() {
    let output = cli().args(["--list-presets", "--json"]).output().unwrap();
    assert!(output.status.success());

    let presets = json(&output.stdout);
    let first = &presets.as_array().unwrap()[0];
    assert_eq!(first["name"], "Microsoft Teams Custom Backgrounds");
    assert!(
        first["install_location"]
            .as_str()
            .unwrap()
            .starts_with("~/Library/Containers/com.microsoft.teams2")
    );
}

#[test]
fn build_without_input_fails() {
    cli()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--input"));
}

#[test]
fn classify_reports_kind_and_version() {
    let workspace = TestWorkspace::new();
    let zip = workspace.path().join("tool-1.2.3.zip");
    std::fs::write(&zip, b"PK\x03\x04").unwrap();

    let output = cli()
        .arg("--classify")
        .arg("--json")
        .arg("--input")
        .arg(&zip)
        .output()
        .unwrap();
    assert!(output.status.success());

    let view = json(&output.stdout);
    assert_eq!(view["kind"], "ZIP Archive");
    assert_eq!(view["version"], "1.2.3");
    assert_eq!(view["suggested_identifier"], "com.company.tool-1.2.3");
}

#[test]
fn json_build_reports_package() {
    let workspace = TestWorkspace::new();
    let zip = workspace.path().join("tool-1.2.3.zip");
    std::fs::write(&zip, b"PK\x03\x04").unwrap();
    let pkg = workspace.path().join("out/tool.pkg");

    let output = cli()
        .arg("--json")
        .arg("--input")
        .arg(&zip)
        .arg("-o")
        .arg(&pkg)
        .arg("--engine")
        .arg(engine("success.sh"))
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);

    let result = json(&output.stdout);
    assert_eq!(result["success"], true);
    assert_eq!(result["size"], 4);
    assert_eq!(result["checksum"].as_str().unwrap().len(), 64);
    assert!(pkg.exists());
}

#[test]
fn failed_build_exits_with_engine_code() {
    let workspace = TestWorkspace::new();
    let zip = workspace.path().join("tool-1.2.3.zip");
    std::fs::write(&zip, b"PK\x03\x04").unwrap();

    let output = cli()
        .arg("--json")
        .arg("--input")
        .arg(&zip)
        .arg("--engine")
        .arg(engine("fail.sh"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));

    let result = json(&output.stdout);
    assert_eq!(result["success"], false);
    assert!(result["error"].as_str().unwrap().contains("payload is missing"));
}

#[test]
fn missing_engine_is_reported() {
    let workspace = TestWorkspace::new();
    let zip = workspace.path().join("tool-1.2.3.zip");
    std::fs::write(&zip, b"PK\x03\x04").unwrap();

    cli()
        .arg("--input")
        .arg(&zip)
        .arg("--engine")
        .arg(workspace.path().join("no-such-engine.sh"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--engine"));
}

#[test]
fn interrupt_cancels_build() {
    use assert_cmd::cargo::CommandCargoExt;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;
    use std::time::{Duration, Instant};

    let workspace = TestWorkspace::new();
    let zip = workspace.path().join("tool-1.2.3.zip");
    std::fs::write(&zip, b"PK\x03\x04").unwrap();

    let mut child = std::process::Command::cargo_bin("kodegen_bundler_pkg")
        .unwrap()
        .env_remove("KODEGEN_PKG_ENGINE")
        .env("TMPDIR", workspace.scratch())
        .arg("--json")
        .arg("--input")
        .arg(&zip)
        .arg("--engine")
        .arg(engine("slow.sh"))
        .stdout(std::process::Stdio::piped())
        .spawn()
        .unwrap();

    // The engine copy shows up once the build has started.
    let deadline = Instant::now() + Duration::from_secs(10);
    while workspace.scratch_files().is_empty() {
        assert!(Instant::now() < deadline, "build never started");
        std::thread::sleep(Duration::from_millis(20));
    }
    std::thread::sleep(Duration::from_millis(500));

    kill(Pid::from_raw(child.id() as i32), Signal::SIGINT).unwrap();
    let output = child.wait_with_output().unwrap();

    assert_eq!(output.status.code(), Some(130));
    let result = json(&output.stdout);
    assert_eq!(result["success"], false);
    assert_eq!(result["error"], "build was cancelled");
    assert!(workspace.scratch_files().is_empty());
}
