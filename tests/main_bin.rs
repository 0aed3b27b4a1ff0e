//! Integration tests that lock main-binary startup behavior and smoke paths.

use std::process::Command;

#[test]
fn main_lists_input_devices() {
    let bin = env!("CARGO_BIN_EXE_voicecall");
    let output = Command::new(bin)
        .arg("--list-input-devices")
        .env("VOICECALL_TEST_DEVICES", "Mic A,Mic B")
        .output()
        .expect("run voicecall");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Available audio input devices:"));
    assert!(stdout.contains("Mic A"));
    assert!(stdout.contains("Mic B"));
}

#[test]
fn main_reports_no_input_devices() {
    let bin = env!("CARGO_BIN_EXE_voicecall");
    let output = Command::new(bin)
        .arg("--list-input-devices")
        .env("VOICECALL_TEST_DEVICES", "")
        .output()
        .expect("run voicecall");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No audio input devices detected."));
}

#[test]
fn main_help_names_the_call_flags() {
    let bin = env!("CARGO_BIN_EXE_voicecall");
    let output = Command::new(bin).arg("--help").output().expect("run voicecall");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--server-url"));
    assert!(stdout.contains("--sample-rate"));
    assert!(stdout.contains("--settle-ms"));
}
