use rstest::rstest;
use turret_core::error::BuildError;
use turret_core::mocks::{RecordingPwm, StaticCounter};
use turret_core::{TimingCfg, Turret, TurretBuilder};
use turret_hardware::{MaxColumnSum, SimCamera, SimLauncher};
use turret_traits::{Clock, ManualClock};

use std::sync::Arc;
use std::time::Duration;

fn complete() -> TurretBuilder {
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(ManualClock::new());
    Turret::builder()
        .with_yaw(StaticCounter::default(), RecordingPwm::default())
        .with_pitch(StaticCounter::default(), RecordingPwm::default())
        .with_camera(SimCamera::new(clock.clone()))
        .with_extractor(MaxColumnSum)
        .with_launcher(SimLauncher::new(clock.clone(), Duration::from_millis(50)))
        .with_clock(clock)
}

#[rstest]
fn builder_missing_camera_yields_typed_build_error() {
    let err = Turret::builder()
        .with_yaw(StaticCounter::default(), RecordingPwm::default())
        .with_pitch(StaticCounter::default(), RecordingPwm::default())
        .try_build()
        .expect_err("should fail with MissingCamera");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingCamera) => {}
        other => panic!("expected MissingCamera, got: {other:?}"),
    }
}

#[rstest]
fn builder_missing_yaw_yields_typed_build_error() {
    let err = Turret::builder().try_build().expect_err("no devices");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingYaw)
    ));
}

#[rstest]
fn complete_builder_succeeds() {
    let t = complete().try_build().expect("build");
    assert_eq!(t.mode(), turret_core::Mode::Idle);
    assert!(!t.state().armed);
}

#[rstest]
#[case(TimingCfg { control_period_ms: 0, ..TimingCfg::default() })]
#[case(TimingCfg { retarget_period_ms: 0, ..TimingCfg::default() })]
#[case(TimingCfg { fire_arm_grace_ms: 5_500, ..TimingCfg::default() })]
fn rejects_bad_timing(#[case] timing: TimingCfg) {
    let err = complete()
        .with_timing(timing)
        .try_build()
        .expect_err("invalid timing");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}

#[rstest]
fn rejects_zero_counts_per_rev() {
    let mut yaw = turret_core::AxisCfg::yaw();
    yaw.counts_per_rev = 0;
    let err = complete().with_yaw_cfg(yaw).try_build().expect_err("cpr");
    assert!(format!("{err}").contains("counts_per_rev"));
}

#[rstest]
fn per_section_overrides_reach_the_scheduler() {
    use turret_core::{CameraCfg, LauncherCfg, TargetingCfg};

    let mut pitch = turret_core::AxisCfg::pitch();
    pitch.position_setpoint = 2.5;
    let t = complete()
        .with_pitch_cfg(pitch)
        .with_launcher_cfg(LauncherCfg { fire_limit: 3 })
        .with_targeting(TargetingCfg {
            slope: 1.0,
            intercept: 0.0,
        })
        .with_camera_cfg(CameraCfg {
            capture_timeout: Duration::from_millis(750),
        })
        .try_build()
        .expect("build");
    assert_eq!(t.pitch_setpoint(), 2.5);
    assert_eq!(t.timing(), &TimingCfg::default());
    assert_eq!(t.pitch().controller().position_setpoint(), 2.5);
}

#[rstest]
fn rejects_zero_capture_timeout() {
    let err = complete()
        .with_camera_cfg(turret_core::CameraCfg {
            capture_timeout: Duration::ZERO,
        })
        .try_build()
        .expect_err("timeout");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}
