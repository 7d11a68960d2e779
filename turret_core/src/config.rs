//! Configuration types for the turret engine.
//!
//! These are the runtime configuration structs used by the scheduler.
//! They are separate from the TOML-deserialized config in `turret_config`.

use std::f64::consts::PI;
use std::time::Duration;

use crate::encoder::CountDirection;

/// Per-axis controller and encoder settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisCfg {
    pub kp: f64,
    pub kd: f64,
    /// Initial position setpoint in radians of motor shaft.
    pub position_setpoint: f64,
    pub velocity_setpoint: f64,
    /// Encoder lines × 4.
    pub counts_per_rev: u32,
    pub direction: CountDirection,
}

impl AxisCfg {
    /// Yaw gains of the reference rig.
    pub fn yaw() -> Self {
        Self {
            kp: 60.0,
            kd: 0.1,
            position_setpoint: PI * 16.0 * 2.5,
            velocity_setpoint: 0.0,
            counts_per_rev: 256 * 4,
            direction: CountDirection::Down,
        }
    }

    /// Pitch gains of the reference rig; the setpoint is held for the whole run.
    pub fn pitch() -> Self {
        Self {
            kp: 30.0,
            kd: 0.1,
            position_setpoint: 8.0,
            velocity_setpoint: 0.0,
            counts_per_rev: 256 * 4,
            direction: CountDirection::Down,
        }
    }
}

/// Task periods and delays, all in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingCfg {
    pub control_period_ms: u32,
    pub retarget_period_ms: u32,
    /// Delay from a completed retarget to the next fire.
    pub fire_delay_ms: u32,
    /// Delay from entering tracking to the first fire. Must exceed the
    /// retarget period so a fresh frame is always taken first.
    pub fire_arm_grace_ms: u32,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            control_period_ms: 10,
            retarget_period_ms: 5_500,
            fire_delay_ms: 500,
            fire_arm_grace_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LauncherCfg {
    /// Shots per tracking session; the fire task after the last shot disarms.
    pub fire_limit: u32,
}

impl Default for LauncherCfg {
    fn default() -> Self {
        Self { fire_limit: 2 }
    }
}

/// Linear column → yaw angle calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetingCfg {
    pub slope: f64,
    pub intercept: f64,
}

impl Default for TargetingCfg {
    fn default() -> Self {
        Self {
            slope: 0.5613,
            intercept: 117.89,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraCfg {
    pub capture_timeout: Duration,
}

impl Default for CameraCfg {
    fn default() -> Self {
        Self {
            capture_timeout: Duration::from_millis(2_000),
        }
    }
}

/// Every runtime setting the scheduler needs, bundled for the builder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurretSettings {
    pub yaw: AxisCfg,
    pub pitch: AxisCfg,
    pub timing: TimingCfg,
    pub launcher: LauncherCfg,
    pub targeting: TargetingCfg,
    pub camera: CameraCfg,
}

impl Default for TurretSettings {
    fn default() -> Self {
        Self {
            yaw: AxisCfg::yaw(),
            pitch: AxisCfg::pitch(),
            timing: TimingCfg::default(),
            launcher: LauncherCfg::default(),
            targeting: TargetingCfg::default(),
            camera: CameraCfg::default(),
        }
    }
}
