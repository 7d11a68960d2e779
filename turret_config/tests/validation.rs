use rstest::rstest;
use turret_config::{CountDirection, load_toml};

const FULL: &str = r#"
[pins]
yaw_enc_a = 17
yaw_enc_b = 27
yaw_forward = 12
yaw_reverse = 13
yaw_enable = 5
pitch_enc_a = 22
pitch_enc_b = 23
pitch_forward = 18
pitch_reverse = 19
pitch_enable = 6
launcher_arm = 24
launcher_trigger = 25
button = 26

[yaw]
kp = 60.0
kd = 0.1
count_direction = "down"

[pitch]
kp = 30.0
position_setpoint = 8.0
counts_per_rev = 2048
count_direction = "up"

[timing]
control_period_ms = 10
retarget_period_ms = 5500
fire_delay_ms = 500
fire_arm_grace_ms = 10000

[launcher]
fire_limit = 2
pulse_ms = 50

[targeting]
slope = 0.5613
intercept = 117.89

[camera]
capture_timeout_ms = 1500

[logging]
rotation = "daily"

[runner]
exit_on_stop = true
"#;

#[test]
fn full_config_parses_and_validates() {
    let cfg = load_toml(FULL).expect("parse TOML");
    cfg.validate().expect("valid");
    let pins = cfg.pins.as_ref().unwrap();
    assert_eq!(pins.button, Some(26));
    assert_eq!(pins.pwm_frequency_hz, 1000.0);
    assert_eq!(cfg.pitch.count_direction, Some(CountDirection::Up));
    assert_eq!(cfg.pitch.counts_per_rev, Some(2048));
    assert_eq!(cfg.yaw.position_setpoint, None);
    assert!(cfg.runner.exit_on_stop);
}

#[rstest]
#[case("[timing]\ncontrol_period_ms = 0\n", "control_period_ms must be >= 1")]
#[case("[timing]\nretarget_period_ms = 0\n", "retarget_period_ms must be >= 1")]
#[case(
    "[timing]\nretarget_period_ms = 5500\nfire_arm_grace_ms = 5500\n",
    "fire_arm_grace_ms must be > timing.retarget_period_ms"
)]
#[case("[launcher]\npulse_ms = 0\n", "pulse_ms must be in [1, 1000]")]
#[case("[yaw]\ncounts_per_rev = 0\n", "yaw.counts_per_rev must be >= 1")]
#[case("[pitch]\nkp = inf\n", "pitch.kp must be finite")]
#[case("[targeting]\nslope = nan\n", "must be finite")]
#[case("[camera]\ncapture_timeout_ms = 0\n", "capture_timeout_ms must be >= 1")]
#[case("[camera]\nwidth = 8\n[sim]\nhot_column = 8\n", "sim.hot_column must be < camera.width")]
#[case("[runner]\nidle_poll_ms = 0\n", "idle_poll_ms must be >= 1")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation")]
fn rejects_invalid(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "error {err} does not mention {needle}"
    );
}

#[test]
fn rejects_duplicate_pins() {
    let toml = FULL.replace("launcher_trigger = 25", "launcher_trigger = 24");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("duplicate GPIO");
    let msg = format!("{err}");
    assert!(msg.contains("launcher_arm") && msg.contains("launcher_trigger"), "{msg}");
}

#[test]
fn rejects_unknown_count_direction() {
    assert!(load_toml("[yaw]\ncount_direction = \"sideways\"\n").is_err());
}

#[test]
fn shipped_reference_config_is_valid() {
    let cfg = load_toml(include_str!("../../etc/turret.toml")).unwrap();
    cfg.validate().unwrap();
    assert!(cfg.pins.is_none());
    assert_eq!(cfg.timing.fire_arm_grace_ms, 10_000);
    assert_eq!(cfg.yaw.count_direction, Some(CountDirection::Down));
}
