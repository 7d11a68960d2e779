use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use assert_cmd::Command;
use tempfile::tempdir;

// Sim-only config with the schedule compressed so two shots land in ~0.4 s.
const FAST_CONFIG: &str = r#"
[timing]
control_period_ms = 10
retarget_period_ms = 200
fire_delay_ms = 20
fire_arm_grace_ms = 400

[launcher]
fire_limit = 2
pulse_ms = 5

[camera]
capture_timeout_ms = 100

[sim]
capture_ms = 20
hot_column = 10

[runner]
idle_poll_ms = 5
"#;

fn write_config(dir: &tempfile::TempDir, extra: &str) -> PathBuf {
    let path = dir.path().join("turret.toml");
    fs::write(&path, format!("{FAST_CONFIG}\n{extra}")).unwrap();
    path
}

fn turret() -> Command {
    Command::cargo_bin("turret").unwrap()
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["peek"], 0, "hot column 10 -> yaw 123.503 rad", "stdout")]
#[case(&["peek", "--sim-column", "4"], 0, "hot column 4 -> yaw 120.135 rad", "stdout")]
#[case(&["peek", "--sim-column", "40"], 3, "outside a 32-column frame", "stderr")]
#[case(&["self-check"], 0, "OK (sim)", "stdout")]
#[case(&["run", "--start", "--max-run-ms", "1500"], 0, "Shots fired: 2 (misfires: 0)", "stdout")]
#[case(&["run", "--max-run-ms", "200"], 0, "Shots fired: 0", "stdout")]
#[case(&["launch"], 2, "unrecognized subcommand", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    let mut cmd = turret();
    cmd.arg("--config").arg(&cfg).arg("--log-level").arg("warn");
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn invalid_timing_is_a_config_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(
        &path,
        "[timing]\nretarget_period_ms = 5500\nfire_arm_grace_ms = 5000\n",
    )
    .unwrap();

    turret()
        .arg("--config")
        .arg(&path)
        .arg("self-check")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("fire_arm_grace_ms"));
}

#[rstest]
fn missing_config_file_is_a_config_error() {
    let dir = tempdir().unwrap();
    turret()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("self-check")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("What happened: Invalid configuration"));
}

#[rstest]
fn capture_timeout_bubbles_to_cli() {
    let dir = tempdir().unwrap();
    // Frames take 20 ms but the timeout is 10 ms.
    let cfg = dir.path().join("slow.toml");
    fs::write(
        &cfg,
        FAST_CONFIG.replace("capture_timeout_ms = 100", "capture_timeout_ms = 10"),
    )
    .unwrap();

    turret()
        .arg("--config")
        .arg(&cfg)
        .arg("peek")
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "What happened: Thermal camera capture timed out",
        ));
}

#[rstest]
fn cli_reports_bad_calibration_header() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    let bad_csv = dir.path().join("calib.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "col,deg").unwrap();
    writeln!(f, "0,100.0").unwrap();
    writeln!(f, "10,105.0").unwrap();

    turret()
        .arg("--config")
        .arg(&cfg)
        .arg("--calibration")
        .arg(&bad_csv)
        .arg("self-check")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Invalid headers"));
}

#[rstest]
fn calibration_csv_replaces_targeting_line() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    let csv = dir.path().join("calib.csv");
    let mut f = fs::File::create(&csv).unwrap();
    writeln!(f, "column,angle").unwrap();
    for col in [0u32, 10, 20, 30] {
        writeln!(f, "{col},{}", 100.0 + 0.5 * f64::from(col)).unwrap();
    }

    turret()
        .arg("--config")
        .arg(&cfg)
        .arg("--calibration")
        .arg(&csv)
        .arg("peek")
        .assert()
        .success()
        .stdout(predicate::str::contains("hot column 10 -> yaw 105.000 rad"));
}

#[rstest]
fn console_keys_serve_idle_diagnostics() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    turret()
        .arg("--config")
        .arg(&cfg)
        .arg("--log-level")
        .arg("warn")
        .args(["run", "--console", "--max-run-ms", "500"])
        .write_stdin("p\nr\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("hot column 10 -> yaw 123.503 rad"))
        .stdout(predicate::str::contains("pitch"))
        .stdout(predicate::str::contains("Shots fired: 0"));
}

#[rstest]
fn console_start_key_begins_tracking() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    turret()
        .arg("--config")
        .arg(&cfg)
        .arg("--log-level")
        .arg("warn")
        .args(["run", "--console", "--max-run-ms", "1500"])
        .write_stdin("s\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Shots fired: 2"));
}

#[rstest]
fn config_max_run_applies_without_flag() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let text = fs::read_to_string(&cfg)
        .unwrap()
        .replace("idle_poll_ms = 5", "idle_poll_ms = 5\nmax_run_ms = 100");
    fs::write(&cfg, text).unwrap();

    turret()
        .arg("--config")
        .arg(&cfg)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Run finished (MaxRun)"));
}
