//! CLI integration tests
//!
//! Run the built `ca-import` binary against the core crate's PEM fixtures.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../core/tests/fixtures")
        .join(name)
}

fn write_config(dir: &TempDir) -> (PathBuf, PathBuf) {
    let ca_dir = dir.path().join("ca");
    let config = dir.path().join("ca-import.toml");
    std::fs::write(
        &config,
        format!("[ca]\ncadir = {:?}\n", ca_dir.display().to_string()),
    )
    .unwrap();
    (config, ca_dir)
}

fn run(key: &str, config: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ca-import"))
        .arg("--private-key")
        .arg(fixture(key))
        .arg("--cert-bundle")
        .arg(fixture("bundle.pem"))
        .arg("--crl-chain")
        .arg(fixture("crl_chain.pem"))
        .arg("--config")
        .arg(config)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI")
}

#[test]
fn test_cli_import_succeeds_then_reports_conflicts() {
    let dir = TempDir::new().unwrap();
    let (config, ca_dir) = write_config(&dir);

    let first = run("ca_key.pem", &config);
    let stdout = String::from_utf8_lossy(&first.stdout);
    assert_eq!(first.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&first.stderr));
    assert!(stdout.contains("Successfully imported CA"));
    assert!(stdout.contains(&ca_dir.display().to_string()));
    assert_eq!(
        std::fs::read_to_string(ca_dir.join("serial")).unwrap(),
        "0x0001"
    );

    let second = run("ca_key.pem", &config);
    let stderr = String::from_utf8_lossy(&second.stderr);
    assert_eq!(second.status.code(), Some(1));
    assert_eq!(stderr.matches("Existing file at").count(), 5);
    assert!(stderr.contains("invalidates every certificate"));
}

#[test]
fn test_cli_mismatched_key_exits_with_failure() {
    let dir = TempDir::new().unwrap();
    let (config, ca_dir) = write_config(&dir);

    let output = run("other_key.pem", &config);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not match"));
    assert!(!ca_dir.exists());
}

#[test]
fn test_cli_requires_all_inputs() {
    let output = Command::new(env!("CARGO_BIN_EXE_ca-import"))
        .arg("--private-key")
        .arg(fixture("ca_key.pem"))
        .output()
        .expect("Failed to execute CLI");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--cert-bundle"));
}
