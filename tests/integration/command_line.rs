//! The binary's stdout contract: exactly one JSON line.

use serde_json::Value;
use std::process::{Command, Output};
use tempfile::TempDir;

use crate::common::write_pdf;

fn run(base_dir: &TempDir, request: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_merge-student-docs"))
        .arg("--base-dir")
        .arg(base_dir.path())
        .arg("--converter")
        .arg("definitely-not-an-office-suite")
        .arg(request)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run binary")
}

fn json_line(output: &Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1, "stdout: {stdout:?}");
    serde_json::from_str(lines[0]).unwrap()
}

#[test]
fn test_successful_batch_prints_success() {
    let dir = TempDir::new().unwrap();
    let student = dir.path().join("王五");
    std::fs::create_dir(&student).unwrap();
    write_pdf(&student.join("1_thesis.pdf"), 2);
    let output_dir = dir.path().join("out");

    let request = serde_json::json!({
        "student_folders": [student],
        "output_dir": output_dir,
    })
    .to_string();
    let output = run(&dir, &request);

    assert!(output.status.success());
    assert_eq!(json_line(&output), serde_json::json!({"success": true}));
    assert!(output_dir.join("王五.pdf").is_file());
}

#[test]
fn test_batch_without_success_prints_false() {
    let dir = TempDir::new().unwrap();
    let request = serde_json::json!({
        "student_folders": [dir.path().join("missing")],
        "output_dir": dir.path().join("out"),
    })
    .to_string();

    let output = run(&dir, &request);

    assert!(output.status.success());
    assert_eq!(json_line(&output), serde_json::json!({"success": false}));
}

#[test]
fn test_malformed_request_prints_error() {
    let dir = TempDir::new().unwrap();

    let output = run(&dir, "{\"student_folders\": ");

    assert!(!output.status.success());
    let line = json_line(&output);
    assert_eq!(line["success"], Value::Bool(false));
    assert!(line["error"].as_str().unwrap().contains("Invalid request"));
}

#[test]
fn test_missing_argument_prints_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_merge-student-docs"))
        .output()
        .expect("Failed to run binary");

    assert!(!output.status.success());
    let line = json_line(&output);
    assert_eq!(line["success"], Value::Bool(false));
    assert!(line["error"].is_string());
}
