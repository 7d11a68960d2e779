//! Builder for the boxed `Turret` and generic `build_scheduler` constructor.

use std::sync::Arc;

use turret_traits::clock::{Clock, MonotonicClock};
use turret_traits::{EncoderCounter, FrameSource, HotColumn, Launcher, PwmOutput};

use crate::axis::TurretAxis;
use crate::config::*;
use crate::error::{BuildError, Result};
use crate::scheduler::{Scheduler, SchedulerState};
use crate::status::RunStats;
use crate::targeting::TargetingEstimator;

/// Dynamic (boxed) turret as assembled from configuration at runtime.
pub type Turret = Scheduler<
    Box<dyn EncoderCounter>,
    Box<dyn PwmOutput>,
    Box<dyn FrameSource>,
    Box<dyn Launcher>,
>;

impl Turret {
    /// Start building a Turret.
    pub fn builder() -> TurretBuilder {
        TurretBuilder::default()
    }
}

type AxisParts = (Box<dyn EncoderCounter>, Box<dyn PwmOutput>);

/// Builder for `Turret`. All fields are validated on `try_build()`.
#[derive(Default)]
pub struct TurretBuilder {
    yaw: Option<AxisParts>,
    pitch: Option<AxisParts>,
    camera: Option<Box<dyn FrameSource>>,
    extractor: Option<Box<dyn HotColumn>>,
    launcher: Option<Box<dyn Launcher>>,
    settings: TurretSettings,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    tick_origin: u32,
}

impl TurretBuilder {
    pub fn with_yaw(
        mut self,
        counter: impl EncoderCounter + 'static,
        pwm: impl PwmOutput + 'static,
    ) -> Self {
        self.yaw = Some((Box::new(counter), Box::new(pwm)));
        self
    }

    pub fn with_pitch(
        mut self,
        counter: impl EncoderCounter + 'static,
        pwm: impl PwmOutput + 'static,
    ) -> Self {
        self.pitch = Some((Box::new(counter), Box::new(pwm)));
        self
    }

    pub fn with_camera(mut self, camera: impl FrameSource + 'static) -> Self {
        self.camera = Some(Box::new(camera));
        self
    }

    pub fn with_extractor(mut self, extractor: impl HotColumn + 'static) -> Self {
        self.extractor = Some(Box::new(extractor));
        self
    }

    pub fn with_launcher(mut self, launcher: impl Launcher + 'static) -> Self {
        self.launcher = Some(Box::new(launcher));
        self
    }

    pub fn with_settings(mut self, settings: TurretSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_yaw_cfg(mut self, cfg: AxisCfg) -> Self {
        self.settings.yaw = cfg;
        self
    }

    pub fn with_pitch_cfg(mut self, cfg: AxisCfg) -> Self {
        self.settings.pitch = cfg;
        self
    }

    pub fn with_timing(mut self, timing: TimingCfg) -> Self {
        self.settings.timing = timing;
        self
    }

    pub fn with_launcher_cfg(mut self, cfg: LauncherCfg) -> Self {
        self.settings.launcher = cfg;
        self
    }

    pub fn with_targeting(mut self, cfg: TargetingCfg) -> Self {
        self.settings.targeting = cfg;
        self
    }

    pub fn with_camera_cfg(mut self, cfg: CameraCfg) -> Self {
        self.settings.camera = cfg;
        self
    }

    /// Inject a clock (tests use `ManualClock`; devices should share it).
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Start the millisecond tick counter at `origin` instead of zero.
    pub fn with_tick_origin(mut self, origin: u32) -> Self {
        self.tick_origin = origin;
        self
    }

    pub fn try_build(self) -> Result<Turret> {
        let yaw = self
            .yaw
            .ok_or_else(|| eyre::Report::new(BuildError::MissingYaw))?;
        let pitch = self
            .pitch
            .ok_or_else(|| eyre::Report::new(BuildError::MissingPitch))?;
        let camera = self
            .camera
            .ok_or_else(|| eyre::Report::new(BuildError::MissingCamera))?;
        let extractor = self
            .extractor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingExtractor))?;
        let launcher = self
            .launcher
            .ok_or_else(|| eyre::Report::new(BuildError::MissingLauncher))?;
        let mut sched = build_scheduler(
            yaw,
            pitch,
            camera,
            extractor,
            launcher,
            self.settings,
            self.clock,
        )?;
        sched.tick_origin = self.tick_origin;
        Ok(sched)
    }
}

fn validate_axis(cfg: &AxisCfg) -> Result<()> {
    if !(cfg.kp.is_finite() && cfg.kd.is_finite()) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "axis gains must be finite",
        )));
    }
    if !(cfg.position_setpoint.is_finite() && cfg.velocity_setpoint.is_finite()) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "axis setpoints must be finite",
        )));
    }
    if cfg.counts_per_rev == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "counts_per_rev must be > 0",
        )));
    }
    Ok(())
}

fn validate(settings: &TurretSettings) -> Result<()> {
    validate_axis(&settings.yaw)?;
    validate_axis(&settings.pitch)?;
    let t = &settings.timing;
    if t.control_period_ms == 0 || t.retarget_period_ms == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "task periods must be > 0",
        )));
    }
    if t.fire_arm_grace_ms <= t.retarget_period_ms {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "fire_arm_grace_ms must exceed retarget_period_ms",
        )));
    }
    // Deadlines must stay within half the tick range to compare correctly.
    let longest = t
        .retarget_period_ms
        .max(t.fire_arm_grace_ms)
        .max(t.fire_delay_ms);
    if longest >= i32::MAX as u32 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "task periods must be < 2^31 ms",
        )));
    }
    if !(settings.targeting.slope.is_finite() && settings.targeting.intercept.is_finite()) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "targeting calibration must be finite",
        )));
    }
    if settings.camera.capture_timeout.is_zero() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "capture timeout must be > 0",
        )));
    }
    Ok(())
}

/// Validate settings and assemble a statically dispatched scheduler.
///
/// Without an injected clock a `MonotonicClock` is used.
pub fn build_scheduler<E, P, F, L>(
    yaw: (E, P),
    pitch: (E, P),
    camera: F,
    extractor: Box<dyn HotColumn>,
    launcher: L,
    settings: TurretSettings,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
) -> Result<Scheduler<E, P, F, L>>
where
    E: EncoderCounter,
    P: PwmOutput,
    F: FrameSource,
    L: Launcher,
{
    validate(&settings)?;

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(c) => c,
        None => Arc::new(MonotonicClock::new()),
    };
    let epoch = clock.now();

    Ok(Scheduler {
        yaw: TurretAxis::new("yaw", yaw.0, yaw.1, &settings.yaw),
        pitch: TurretAxis::new("pitch", pitch.0, pitch.1, &settings.pitch),
        camera,
        launcher,
        targeting: TargetingEstimator::new(
            settings.targeting.slope,
            settings.targeting.intercept,
            extractor,
        ),
        timing: settings.timing,
        launcher_cfg: settings.launcher,
        camera_cfg: settings.camera,
        clock,
        epoch,
        tick_origin: 0,
        state: SchedulerState::default(),
        yaw_setpoint: settings.yaw.position_setpoint,
        pitch_setpoint: settings.pitch.position_setpoint,
        last_target: None,
        after_blocking: false,
        stats: RunStats::default(),
    })
}
