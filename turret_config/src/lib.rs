#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and targeting calibration parsing for the turret.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Calibration CSV loader enforces headers and performs a robust refit
//!   to reduce outlier influence before slope/intercept estimation.
use serde::Deserialize;

/// Calibration CSV schema: thermal column observed when the turret was
/// pointed at a target with a known yaw angle.
///
/// Expected headers:
/// column,angle
///
/// Example:
/// column,angle
/// 4,120.14
/// 28,133.61
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CalibrationRow {
    pub column: u32,
    pub angle: f64,
}

/// GPIO assignment (BCM numbering). Only needed for the hardware back end.
#[derive(Debug, Deserialize)]
pub struct Pins {
    pub yaw_enc_a: u8,
    pub yaw_enc_b: u8,
    pub yaw_forward: u8,
    pub yaw_reverse: u8,
    pub yaw_enable: u8,
    pub pitch_enc_a: u8,
    pub pitch_enc_b: u8,
    pub pitch_forward: u8,
    pub pitch_reverse: u8,
    pub pitch_enable: u8,
    pub launcher_arm: u8,
    pub launcher_trigger: u8,
    /// Start/stop push button (active low). Console `s` works either way.
    pub button: Option<u8>,
    #[serde(default = "default_pwm_hz")]
    pub pwm_frequency_hz: f64,
}

fn default_pwm_hz() -> f64 {
    1_000.0
}

impl Pins {
    fn all(&self) -> Vec<(&'static str, u8)> {
        let mut v = vec![
            ("yaw_enc_a", self.yaw_enc_a),
            ("yaw_enc_b", self.yaw_enc_b),
            ("yaw_forward", self.yaw_forward),
            ("yaw_reverse", self.yaw_reverse),
            ("yaw_enable", self.yaw_enable),
            ("pitch_enc_a", self.pitch_enc_a),
            ("pitch_enc_b", self.pitch_enc_b),
            ("pitch_forward", self.pitch_forward),
            ("pitch_reverse", self.pitch_reverse),
            ("pitch_enable", self.pitch_enable),
            ("launcher_arm", self.launcher_arm),
            ("launcher_trigger", self.launcher_trigger),
        ];
        if let Some(b) = self.button {
            v.push(("button", b));
        }
        v
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CountDirection {
    Up,
    #[default]
    Down,
}

/// Per-axis overrides. Absent fields keep the reference rig's values for
/// that axis.
#[derive(Debug, Deserialize, Clone, Copy, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AxisCfg {
    pub kp: Option<f64>,
    pub kd: Option<f64>,
    /// Radians of motor shaft.
    pub position_setpoint: Option<f64>,
    pub velocity_setpoint: Option<f64>,
    /// Encoder lines × 4.
    pub counts_per_rev: Option<u32>,
    pub count_direction: Option<CountDirection>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct TimingCfg {
    pub control_period_ms: u32,
    pub retarget_period_ms: u32,
    pub fire_delay_ms: u32,
    /// First fire after entering tracking; must exceed `retarget_period_ms`.
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

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct LauncherCfg {
    pub fire_limit: u32,
    /// Trigger pulse length per shot.
    pub pulse_ms: u64,
}

impl Default for LauncherCfg {
    fn default() -> Self {
        Self {
            fire_limit: 2,
            pulse_ms: 50,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
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

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct CameraCfg {
    pub capture_timeout_ms: u64,
    pub width: usize,
    pub height: usize,
}

impl Default for CameraCfg {
    fn default() -> Self {
        Self {
            capture_timeout_ms: 2_000,
            width: 32,
            height: 24,
        }
    }
}

/// Parameters of the simulated back end.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SimCfg {
    /// Simulated exposure per frame.
    pub capture_ms: u64,
    /// Column the simulated target sits in.
    pub hot_column: usize,
    pub max_speed_ticks_per_s: f64,
    pub time_constant_s: f64,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            capture_ms: 500,
            hot_column: 16,
            max_speed_ticks_per_s: 4_000.0,
            time_constant_s: 0.05,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunnerCfg {
    /// Exit the program on a stop edge instead of returning to idle.
    pub exit_on_stop: bool,
    pub idle_poll_ms: u64,
    /// Hard cap on a run; 0 disables.
    pub max_run_ms: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            exit_on_stop: false,
            idle_poll_ms: 20,
            max_run_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub pins: Option<Pins>,
    #[serde(default)]
    pub yaw: AxisCfg,
    #[serde(default)]
    pub pitch: AxisCfg,
    #[serde(default)]
    pub timing: TimingCfg,
    #[serde(default)]
    pub launcher: LauncherCfg,
    #[serde(default)]
    pub targeting: TargetingCfg,
    #[serde(default)]
    pub camera: CameraCfg,
    #[serde(default)]
    pub sim: SimCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub runner: RunnerCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Linear column → angle calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetingCalibration {
    pub slope: f64,
    pub intercept: f64,
}

impl TargetingCalibration {
    /// Fit `angle = slope * column + intercept` by ordinary least squares,
    /// then refit once without points further than 2σ from the first line.
    pub fn from_rows(rows: Vec<CalibrationRow>) -> eyre::Result<Self> {
        if rows.len() < 2 {
            eyre::bail!("calibration requires at least two rows, got {}", rows.len());
        }
        for (i, r) in rows.iter().enumerate() {
            if !r.angle.is_finite() {
                eyre::bail!("calibration row {} has a non-finite angle", i);
            }
        }

        let pts: Vec<(f64, f64)> = rows.iter().map(|r| (f64::from(r.column), r.angle)).collect();
        let (a0, b0) = fit(&pts)?;

        let sumsq: f64 = pts
            .iter()
            .map(|(x, y)| {
                let r = y - (a0 * x + b0);
                r * r
            })
            .sum();
        let rms = (sumsq / pts.len() as f64).sqrt();

        let (slope, intercept) = robust_refit(&pts, a0, b0, rms, 2.0).unwrap_or((a0, b0));
        Ok(Self { slope, intercept })
    }

    pub fn angle_for(&self, column: u32) -> f64 {
        f64::from(column) * self.slope + self.intercept
    }
}

fn fit(pts: &[(f64, f64)]) -> eyre::Result<(f64, f64)> {
    let n = pts.len() as f64;
    let mean_x = pts.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pts.iter().map(|p| p.1).sum::<f64>() / n;
    let mut sxx = 0.0f64;
    let mut sxy = 0.0f64;
    for (x, y) in pts {
        let dx = x - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }
    if !sxx.is_finite() || sxx == 0.0 {
        eyre::bail!("calibration needs at least two distinct columns");
    }
    let a = sxy / sxx;
    if !a.is_finite() {
        eyre::bail!("calibration produced non-finite slope");
    }
    Ok((a, mean_y - a * mean_x))
}

/// Single-step robust refit over inliers (|residual| <= k * rms) of the
/// line `y = a0*x + b0`. `None` when nothing was rejected, fewer than two
/// inliers remain, or the inliers are degenerate; the caller then keeps
/// `(a0, b0)`.
fn robust_refit(pts: &[(f64, f64)], a0: f64, b0: f64, rms: f64, k: f64) -> Option<(f64, f64)> {
    if !(rms.is_finite() && rms > 0.0 && k.is_finite() && k > 0.0) {
        return None;
    }
    let thr = k * rms;
    let inliers: Vec<(f64, f64)> = pts
        .iter()
        .copied()
        .filter(|(x, y)| (y - (a0 * x + b0)).abs() <= thr)
        .collect();
    if inliers.len() < 2 || inliers.len() == pts.len() {
        return None;
    }
    fit(&inliers).ok()
}

impl TryFrom<Vec<CalibrationRow>> for TargetingCalibration {
    type Error = eyre::Report;
    fn try_from(rows: Vec<CalibrationRow>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl TryFrom<&[CalibrationRow]> for TargetingCalibration {
    type Error = eyre::Report;
    fn try_from(rows: &[CalibrationRow]) -> Result<Self, Self::Error> {
        Self::from_rows(rows.to_vec())
    }
}

pub fn load_calibration_csv(path: &std::path::Path) -> eyre::Result<TargetingCalibration> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open calibration CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["column", "angle"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "calibration CSV must have headers 'column,angle', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CalibrationRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    TargetingCalibration::try_from(rows)
}

fn check_axis(name: &str, a: &AxisCfg) -> eyre::Result<()> {
    for (field, v) in [
        ("kp", a.kp),
        ("kd", a.kd),
        ("position_setpoint", a.position_setpoint),
        ("velocity_setpoint", a.velocity_setpoint),
    ] {
        if let Some(v) = v
            && !v.is_finite()
        {
            eyre::bail!("{name}.{field} must be finite");
        }
    }
    if a.counts_per_rev == Some(0) {
        eyre::bail!("{name}.counts_per_rev must be >= 1");
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Axes
        check_axis("yaw", &self.yaw)?;
        check_axis("pitch", &self.pitch)?;

        // Timing
        if self.timing.control_period_ms == 0 {
            eyre::bail!("timing.control_period_ms must be >= 1");
        }
        if self.timing.retarget_period_ms == 0 {
            eyre::bail!("timing.retarget_period_ms must be >= 1");
        }
        if self.timing.fire_arm_grace_ms <= self.timing.retarget_period_ms {
            eyre::bail!("timing.fire_arm_grace_ms must be > timing.retarget_period_ms");
        }
        if self.timing.fire_arm_grace_ms > 24 * 60 * 60 * 1000 {
            eyre::bail!("timing.fire_arm_grace_ms is unreasonably large (>24h)");
        }

        // Launcher
        if self.launcher.pulse_ms == 0 || self.launcher.pulse_ms > 1_000 {
            eyre::bail!("launcher.pulse_ms must be in [1, 1000]");
        }

        // Targeting
        if !self.targeting.slope.is_finite() || !self.targeting.intercept.is_finite() {
            eyre::bail!("targeting.slope and targeting.intercept must be finite");
        }

        // Camera
        if self.camera.capture_timeout_ms == 0 {
            eyre::bail!("camera.capture_timeout_ms must be >= 1");
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            eyre::bail!("camera.width and camera.height must be >= 1");
        }

        // Sim
        if self.sim.hot_column >= self.camera.width {
            eyre::bail!("sim.hot_column must be < camera.width");
        }
        if !(self.sim.max_speed_ticks_per_s.is_finite() && self.sim.max_speed_ticks_per_s > 0.0) {
            eyre::bail!("sim.max_speed_ticks_per_s must be > 0");
        }
        if !(self.sim.time_constant_s.is_finite() && self.sim.time_constant_s > 0.0) {
            eyre::bail!("sim.time_constant_s must be > 0");
        }

        // Runner
        if self.runner.idle_poll_ms == 0 {
            eyre::bail!("runner.idle_poll_ms must be >= 1");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        // Pins
        if let Some(p) = &self.pins {
            if !(p.pwm_frequency_hz.is_finite() && p.pwm_frequency_hz > 0.0) {
                eyre::bail!("pins.pwm_frequency_hz must be > 0");
            }
            let all = p.all();
            for (i, (name_a, a)) in all.iter().enumerate() {
                if let Some((name_b, _)) = all[i + 1..].iter().find(|(_, b)| b == a) {
                    eyre::bail!("pins.{name_a} and pins.{name_b} both use GPIO {a}");
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_reference_config() {
        let cfg = load_toml("").unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.timing.retarget_period_ms, 5_500);
        assert_eq!(cfg.launcher.fire_limit, 2);
        assert!(cfg.pins.is_none());
        assert!(cfg.yaw.kp.is_none());
    }

    #[test]
    fn unknown_axis_field_is_rejected() {
        assert!(load_toml("[yaw]\nkq = 1.0\n").is_err());
    }
}
