use std::process::Command;

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn robot_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_rovervox-robot").expect("rovervox-robot test binary not built")
}

fn voice_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_rovervox-voice").expect("rovervox-voice test binary not built")
}

#[test]
fn robot_help_lists_motion_flags() {
    let output = Command::new(robot_bin())
        .arg("--help")
        .output()
        .expect("run rovervox-robot --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("RoverVox robot controller"));
    assert!(combined.contains("--base-speed"));
    assert!(combined.contains("--sensor-file"));
}

#[test]
fn voice_help_lists_wake_flags() {
    let output = Command::new(voice_bin())
        .arg("--help")
        .output()
        .expect("run rovervox-voice --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("RoverVox voice assistant"));
    assert!(combined.contains("--wake-phrase"));
    assert!(combined.contains("--offline"));
}

#[test]
fn robot_rejects_out_of_range_speed() {
    let output = Command::new(robot_bin())
        .args(["--base-speed", "150", "--no-keyboard"])
        .output()
        .expect("run rovervox-robot with a bad speed");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("--base-speed must be between 0 and 100"));
}

#[test]
fn robot_fails_fast_on_missing_sensor_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("ir.txt");
    let output = Command::new(robot_bin())
        .args(["--no-keyboard", "--sensor-file"])
        .arg(&missing)
        .output()
        .expect("run rovervox-robot with a missing sensor file");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("failed to open IR sensors"));
}

#[test]
fn voice_exits_when_synthesis_service_is_down() {
    let output = Command::new(voice_bin())
        .args([
            "--server-url",
            "http://127.0.0.1:9",
            "--health-timeout-ms",
            "500",
        ])
        .output()
        .expect("run rovervox-voice against a closed port");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("unreachable"));
}

#[test]
fn offline_voice_exits_cleanly_when_stdin_closes() {
    let output = Command::new(voice_bin())
        .arg("--offline")
        .stdin(std::process::Stdio::null())
        .output()
        .expect("run rovervox-voice --offline");
    assert!(output.status.success());
}
