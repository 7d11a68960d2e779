//! `From` implementations bridging `turret_config` types to `turret_core` types.

use std::time::Duration;

use crate::config::{AxisCfg, CameraCfg, LauncherCfg, TargetingCfg, TimingCfg, TurretSettings};
use crate::encoder::CountDirection;

// ── Axes ─────────────────────────────────────────────────────────────────────

impl From<turret_config::CountDirection> for CountDirection {
    fn from(d: turret_config::CountDirection) -> Self {
        match d {
            turret_config::CountDirection::Up => CountDirection::Up,
            turret_config::CountDirection::Down => CountDirection::Down,
        }
    }
}

impl AxisCfg {
    /// Apply the fields present in a TOML axis section over `self`.
    pub fn with_overrides(self, o: &turret_config::AxisCfg) -> Self {
        Self {
            kp: o.kp.unwrap_or(self.kp),
            kd: o.kd.unwrap_or(self.kd),
            position_setpoint: o.position_setpoint.unwrap_or(self.position_setpoint),
            velocity_setpoint: o.velocity_setpoint.unwrap_or(self.velocity_setpoint),
            counts_per_rev: o.counts_per_rev.unwrap_or(self.counts_per_rev),
            direction: o.count_direction.map_or(self.direction, Into::into),
        }
    }
}

// ── Scheduler ────────────────────────────────────────────────────────────────

impl From<&turret_config::TimingCfg> for TimingCfg {
    fn from(c: &turret_config::TimingCfg) -> Self {
        Self {
            control_period_ms: c.control_period_ms,
            retarget_period_ms: c.retarget_period_ms,
            fire_delay_ms: c.fire_delay_ms,
            fire_arm_grace_ms: c.fire_arm_grace_ms,
        }
    }
}

impl From<&turret_config::LauncherCfg> for LauncherCfg {
    fn from(c: &turret_config::LauncherCfg) -> Self {
        Self {
            fire_limit: c.fire_limit,
        }
    }
}

// ── Targeting ────────────────────────────────────────────────────────────────

impl From<&turret_config::TargetingCfg> for TargetingCfg {
    fn from(c: &turret_config::TargetingCfg) -> Self {
        Self {
            slope: c.slope,
            intercept: c.intercept,
        }
    }
}

impl From<&turret_config::TargetingCalibration> for TargetingCfg {
    fn from(c: &turret_config::TargetingCalibration) -> Self {
        Self {
            slope: c.slope,
            intercept: c.intercept,
        }
    }
}

impl From<&turret_config::CameraCfg> for CameraCfg {
    fn from(c: &turret_config::CameraCfg) -> Self {
        Self {
            capture_timeout: Duration::from_millis(c.capture_timeout_ms),
        }
    }
}

// ── Everything ───────────────────────────────────────────────────────────────

impl From<&turret_config::Config> for TurretSettings {
    fn from(c: &turret_config::Config) -> Self {
        Self {
            yaw: AxisCfg::yaw().with_overrides(&c.yaw),
            pitch: AxisCfg::pitch().with_overrides(&c.pitch),
            timing: (&c.timing).into(),
            launcher: (&c.launcher).into(),
            targeting: (&c.targeting).into(),
            camera: (&c.camera).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_overrides_keep_per_axis_defaults() {
        let cfg = turret_config::load_toml("[pitch]\nkd = 0.5\ncount_direction = \"up\"\n").unwrap();
        let s = TurretSettings::from(&cfg);
        assert_eq!(s.yaw, AxisCfg::yaw());
        assert_eq!(s.pitch.kp, 30.0);
        assert_eq!(s.pitch.kd, 0.5);
        assert_eq!(s.pitch.position_setpoint, 8.0);
        assert_eq!(s.pitch.direction, CountDirection::Up);
    }

    #[test]
    fn camera_timeout_is_milliseconds() {
        let cfg = turret_config::load_toml("[camera]\ncapture_timeout_ms = 750\n").unwrap();
        let s = TurretSettings::from(&cfg);
        assert_eq!(s.camera.capture_timeout, Duration::from_millis(750));
        assert_eq!(s.timing, TimingCfg::default());
    }
}
