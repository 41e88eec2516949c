mod common;

use std::process::Command;

use common::int32_container;
use tempfile::tempdir;

fn bin() -> String {
    env!("CARGO_BIN_EXE_xnbkit").to_string()
}

#[test]
fn cli_unpack_pack_roundtrip() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("value.xnb");
    let json = dir.path().join("value.json");
    let packed = dir.path().join("repacked.xnb");
    std::fs::write(&input, int32_container(-77)).unwrap();

    let out = Command::new(bin())
        .arg("unpack")
        .arg(&input)
        .output()
        .unwrap();
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("Success 1"));

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(doc["header"]["target"], "w");
    assert_eq!(doc["content"], -77);

    let st = Command::new(bin())
        .arg("pack")
        .arg(&json)
        .arg(&packed)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(
        std::fs::read(&packed).unwrap(),
        std::fs::read(&input).unwrap()
    );
}

#[test]
fn cli_header_prints_prologue() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("value.xnb");
    std::fs::write(&input, int32_container(1)).unwrap();

    let out = Command::new(bin())
        .arg("header")
        .arg(&input)
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Platform: w (Microsoft Windows)"));
    assert!(stdout.contains("Format version: 5"));
    assert!(stdout.contains("Compression: None"));
}

#[test]
fn cli_corrupt_input_fails() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("broken.xnb");
    let mut data = int32_container(1);
    data.truncate(data.len() - 2);
    std::fs::write(&input, data).unwrap();

    let out = Command::new(bin())
        .arg("--silent")
        .arg("unpack")
        .arg(&input)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Success 0"));
    assert!(stdout.contains("Fail 1"));
    assert!(!dir.path().join("broken.json").exists());
}

#[test]
fn cli_wrong_extension_fails() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("value.bin");
    std::fs::write(&input, int32_container(1)).unwrap();

    let out = Command::new(bin())
        .arg("unpack")
        .arg(&input)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Fail 1"));
}

#[test]
fn cli_existing_output_needs_force() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("value.xnb");
    let json = dir.path().join("value.json");
    std::fs::write(&input, int32_container(5)).unwrap();
    std::fs::write(&json, b"keep me").unwrap();

    let st = Command::new(bin())
        .arg("unpack")
        .arg(&input)
        .status()
        .unwrap();
    assert!(!st.success());
    assert_eq!(std::fs::read(&json).unwrap(), b"keep me");

    let st = Command::new(bin())
        .arg("-f")
        .arg("unpack")
        .arg(&input)
        .status()
        .unwrap();
    assert!(st.success());
    assert_ne!(std::fs::read(&json).unwrap(), b"keep me");
}

#[test]
fn cli_no_arguments_prints_help() {
    let out = Command::new(bin()).output().unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Usage"));
}
