use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[timing]
control_period_ms = 10
retarget_period_ms = 200
fire_delay_ms = 20
fire_arm_grace_ms = 400

[launcher]
pulse_ms = 5

[sim]
capture_ms = 20
hot_column = 10

[runner]
idle_poll_ms = 5
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn last_json_line(stdout: &[u8]) -> serde_json::Value {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .rev()
        .find(|l| l.trim_start().starts_with('{'))
        .unwrap_or_else(|| panic!("no JSON line in stdout: {text}"));
    serde_json::from_str(line).unwrap()
}

/// Validate the JSON summary of a completed run.
#[rstest]
fn json_run_summary_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("turret")
        .unwrap()
        .arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--start", "--max-run-ms", "1500"])
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let v = last_json_line(&out.stdout);
    assert_eq!(v["reason"], "MaxRun");
    assert_eq!(v["shots"], 2);
    assert_eq!(v["misfires"], 0);
    assert_eq!(v["disarms"], 1);
    assert_eq!(v["starts"], 1);
    assert!(v["retargets"].as_u64().unwrap() >= 2);
    assert!(v["control_ticks"].as_u64().unwrap() > 0);
    for key in ["stops", "capture_timeouts", "deadline_overruns", "max_pass_us"] {
        assert!(v[key].is_u64(), "missing {key}");
    }
}

#[rstest]
fn json_peek_reports_column_and_angle() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("turret")
        .unwrap()
        .args(["--json", "--log-level", "error", "--config"])
        .arg(&cfg)
        .arg("peek")
        .output()
        .unwrap();
    assert!(out.status.success());

    let v = last_json_line(&out.stdout);
    assert_eq!(v["column"], 10);
    let angle = v["angle"].as_f64().unwrap();
    assert!((angle - 123.503).abs() < 1e-9, "angle {angle}");
}

#[rstest]
fn json_errors_are_structured() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[launcher]\npulse_ms = 0\n").unwrap();

    let out = Command::cargo_bin("turret")
        .unwrap()
        .args(["--json", "--config"])
        .arg(&path)
        .arg("self-check")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));

    let v = last_json_line(&out.stdout);
    assert_eq!(v["reason"], "Config");
    assert_eq!(v["exit_code"], 3);
    assert!(v["message"].as_str().unwrap().contains("launcher.pulse_ms"));
}
