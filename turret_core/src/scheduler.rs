//! Cooperative deadline scheduler multiplexing the retarget, fire and
//! control tasks onto one thread.
//!
//! Each pass dispatches at most one task, in strict priority order:
//! retarget, fire, control. Deadlines sit on the wrapping millisecond tick
//! counter from [`crate::util`]. Frame capture blocks for its whole
//! exposure; motors are zeroed before it starts so neither axis runs
//! unattended while the loop is stalled.

use std::sync::Arc;
use std::time::{Duration, Instant};

use eyre::WrapErr;
use turret_traits::{Clock, EncoderCounter, FrameSource, Launcher, PwmOutput};

use crate::axis::TurretAxis;
use crate::config::{CameraCfg, LauncherCfg, TimingCfg};
use crate::error::{Report, Result, TurretError};
use crate::hw_error::{map_hw_error, report};
use crate::status::{Mode, Pass, RunStats};
use crate::targeting::{Target, TargetingEstimator};
use crate::util::{is_due, ms_until, ticks_add, ticks_diff};

/// Mode, deadlines and fire bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerState {
    pub mode: Mode,
    pub next_control: u32,
    pub next_retarget: u32,
    pub next_fire: u32,
    pub shot_count: u32,
    pub armed: bool,
}

pub struct Scheduler<E, P, F, L>
where
    E: EncoderCounter,
    P: PwmOutput,
    F: FrameSource,
    L: Launcher,
{
    pub(crate) yaw: TurretAxis<E, P>,
    pub(crate) pitch: TurretAxis<E, P>,
    pub(crate) camera: F,
    pub(crate) launcher: L,
    pub(crate) targeting: TargetingEstimator,
    pub(crate) timing: TimingCfg,
    pub(crate) launcher_cfg: LauncherCfg,
    pub(crate) camera_cfg: CameraCfg,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,
    pub(crate) tick_origin: u32,
    pub(crate) state: SchedulerState,
    pub(crate) yaw_setpoint: f64,
    pub(crate) pitch_setpoint: f64,
    pub(crate) last_target: Option<Target>,
    pub(crate) after_blocking: bool,
    pub(crate) stats: RunStats,
}

impl<E, P, F, L> core::fmt::Debug for Scheduler<E, P, F, L>
where
    E: EncoderCounter,
    P: PwmOutput,
    F: FrameSource,
    L: Launcher,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.state)
            .field("yaw_setpoint", &self.yaw_setpoint)
            .field("pitch_setpoint", &self.pitch_setpoint)
            .field("yaw", &self.yaw)
            .field("pitch", &self.pitch)
            .finish()
    }
}

impl<E, P, F, L> Scheduler<E, P, F, L>
where
    E: EncoderCounter,
    P: PwmOutput,
    F: FrameSource,
    L: Launcher,
{
    /// Current time on the wrapping millisecond tick counter.
    pub fn now_ms(&self) -> u32 {
        // Truncation is the wrap.
        (self.clock.ms_since(self.epoch) as u32).wrapping_add(self.tick_origin)
    }

    fn now_us(&self) -> u64 {
        self.clock.us_since(self.epoch)
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn yaw(&self) -> &TurretAxis<E, P> {
        &self.yaw
    }

    pub fn pitch(&self) -> &TurretAxis<E, P> {
        &self.pitch
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn yaw_setpoint(&self) -> f64 {
        self.yaw_setpoint
    }

    pub fn pitch_setpoint(&self) -> f64 {
        self.pitch_setpoint
    }

    pub fn last_target(&self) -> Option<Target> {
        self.last_target
    }

    pub fn timing(&self) -> &TimingCfg {
        &self.timing
    }

    /// Handle a start/stop edge.
    pub fn toggle(&mut self) -> Result<Pass> {
        match self.state.mode {
            Mode::Idle => {
                self.start()?;
                Ok(Pass::Started)
            }
            Mode::Tracking => {
                self.stop()?;
                Ok(Pass::Stopped)
            }
        }
    }

    /// Idle → Tracking: arm, zero encoders, restore the configured
    /// setpoints, take a first frame and lay out the deadlines.
    pub fn start(&mut self) -> Result<()> {
        if self.state.mode == Mode::Tracking {
            return Ok(());
        }
        let entry = self.now_ms();
        tracing::info!("tracking start");

        self.launcher.arm().map_err(report).wrap_err("launcher arm")?;
        self.state.armed = true;
        self.yaw.enable(true)?;
        self.pitch.enable(true)?;
        self.yaw.zero()?;
        self.pitch.zero()?;
        // A timed-out first capture must not aim at the last session's target.
        self.yaw_setpoint = self.yaw.home_setpoint();
        self.pitch_setpoint = self.pitch.home_setpoint();
        self.last_target = None;
        self.acquire_target()?;

        let now = self.now_ms();
        self.state.next_control = ticks_add(now, self.timing.control_period_ms);
        self.state.next_retarget = ticks_add(entry, self.timing.retarget_period_ms);
        self.state.next_fire = ticks_add(now, self.timing.fire_arm_grace_ms);
        self.state.shot_count = 0;
        self.state.mode = Mode::Tracking;
        self.after_blocking = true;
        self.stats.starts += 1;
        Ok(())
    }

    /// Tracking → Idle: neutral motors and disarm.
    pub fn stop(&mut self) -> Result<()> {
        if self.state.mode == Mode::Idle {
            return Ok(());
        }
        self.safe_stop()?;
        self.stats.stops += 1;
        tracing::info!(shots = self.state.shot_count.min(self.launcher_cfg.fire_limit), "tracking stop");
        Ok(())
    }

    /// Zero both motors and disarm regardless of mode. Every step is
    /// attempted; the first failure is returned.
    pub fn safe_stop(&mut self) -> Result<()> {
        let yaw = self.yaw.stop();
        let pitch = self.pitch.stop();
        let disarm = self
            .launcher
            .disarm()
            .map_err(report)
            .wrap_err("launcher disarm");
        self.state.armed = false;
        self.state.mode = Mode::Idle;
        yaw.and(pitch).and(disarm)
    }

    /// One pass: dispatch the highest-priority due task, if any.
    pub fn step(&mut self) -> Result<Pass> {
        if self.state.mode == Mode::Idle {
            return Ok(Pass::Idle);
        }
        let now = self.now_ms();
        if is_due(now, self.state.next_retarget) {
            self.retarget()?;
            Ok(Pass::Retarget)
        } else if is_due(now, self.state.next_fire) {
            self.fire()?;
            Ok(Pass::Fire)
        } else if is_due(now, self.state.next_control) {
            self.control()?;
            Ok(Pass::Control)
        } else {
            Ok(Pass::Waiting)
        }
    }

    /// Time until the earliest pending deadline; zero when one is due.
    pub fn time_to_next_deadline(&self) -> Duration {
        let now = self.now_ms();
        let ms = [
            self.state.next_retarget,
            self.state.next_fire,
            self.state.next_control,
        ]
        .into_iter()
        .map(|d| ms_until(now, d))
        .min()
        .unwrap_or(0);
        Duration::from_millis(u64::from(ms))
    }

    /// Retarget task: zero motors, capture, recompute the yaw setpoint.
    pub fn retarget(&mut self) -> Result<()> {
        self.yaw.stop()?;
        self.pitch.stop()?;
        let t0 = self.clock.now();
        let target = self.acquire_target()?;
        let capture_ms = self.clock.now().saturating_duration_since(t0).as_millis() as u64;

        let now = self.now_ms();
        self.state.next_retarget = ticks_add(now, self.timing.retarget_period_ms);
        self.state.next_fire = ticks_add(now, self.timing.fire_delay_ms);
        self.after_blocking = true;
        self.stats.retargets += 1;
        tracing::debug!(
            column = target.map(|t| t.column),
            setpoint = self.yaw_setpoint,
            capture_ms,
            "retarget"
        );
        Ok(())
    }

    /// Fire task: shoot until the limit, then disarm once. A launcher that
    /// reports itself disarmed is not pulsed; the shot counts as a misfire.
    pub fn fire(&mut self) -> Result<()> {
        let now = self.now_ms();
        let limit = self.launcher_cfg.fire_limit;
        if self.state.shot_count < limit {
            if self.state.armed && self.launcher.is_armed() {
                self.launcher.fire().map_err(report).wrap_err("launcher fire")?;
                self.stats.shots += 1;
                tracing::info!(shot = self.state.shot_count + 1, limit, "fired");
            } else {
                self.stats.misfires += 1;
                tracing::warn!("fire requested while disarmed; not ready");
            }
        } else if self.state.shot_count == limit {
            self.launcher
                .disarm()
                .map_err(report)
                .wrap_err("launcher disarm")?;
            self.state.armed = false;
            self.stats.disarms += 1;
            tracing::info!(limit, "fire limit reached; launcher disarmed");
        }
        self.state.shot_count = self.state.shot_count.saturating_add(1);
        self.state.next_retarget = now;
        self.after_blocking = true;
        Ok(())
    }

    /// Control task: refresh setpoints, run both PD loops.
    pub fn control(&mut self) -> Result<()> {
        let now = self.now_ms();
        let period = self.timing.control_period_ms;
        let late = ticks_diff(now, self.state.next_control);
        if late > period as i32 && !self.after_blocking {
            self.stats.deadline_overruns += 1;
            tracing::warn!(late_ms = late, "control deadline overrun");
        }
        self.after_blocking = false;
        self.state.next_control = ticks_add(now, period);

        self.yaw
            .controller_mut()
            .set_position_setpoint(self.yaw_setpoint);
        self.pitch
            .controller_mut()
            .set_position_setpoint(self.pitch_setpoint);
        let now_us = self.now_us();
        self.yaw.control_step(now_us)?;
        self.pitch.control_step(now_us)?;
        self.stats.control_ticks += 1;
        Ok(())
    }

    /// Capture one frame and locate the target without touching any
    /// setpoint. `None` when the capture timed out.
    pub fn peek(&mut self) -> Result<Option<Target>> {
        self.capture_target()
    }

    /// Sample both encoders; `(yaw, pitch)` in radians.
    pub fn positions(&mut self) -> Result<(f64, f64)> {
        let now_us = self.now_us();
        self.yaw.sample(now_us)?;
        self.pitch.sample(now_us)?;
        Ok((self.yaw.position_radians(), self.pitch.position_radians()))
    }

    pub(crate) fn record_pass(&mut self, elapsed: Duration) {
        let us = elapsed.as_micros() as u64;
        self.stats.max_pass_us = self.stats.max_pass_us.max(us);
    }

    /// Capture and adopt the target as the new yaw setpoint. A capture
    /// timeout keeps the previous setpoint.
    fn acquire_target(&mut self) -> Result<Option<Target>> {
        let target = self.capture_target()?;
        if let Some(t) = target {
            self.yaw_setpoint = t.angle;
            self.last_target = Some(t);
        }
        Ok(target)
    }

    fn capture_target(&mut self) -> Result<Option<Target>> {
        let timeout = self.camera_cfg.capture_timeout;
        match self.camera.capture(timeout) {
            Ok(frame) => Ok(Some(self.targeting.locate(&frame))),
            Err(e) => match map_hw_error(&*e) {
                TurretError::Timeout => {
                    self.stats.capture_timeouts += 1;
                    tracing::warn!(
                        timeout_ms = timeout.as_millis() as u64,
                        setpoint = self.yaw_setpoint,
                        "frame capture timed out; keeping previous setpoint"
                    );
                    Ok(None)
                }
                other => Err(Report::new(other).wrap_err("frame capture")),
            },
        }
    }
}
