//! Device assembly: the simulated rig, or rppal drivers behind `hardware`.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use eyre::Result;
use turret_config::Config;
use turret_core::{StartStopSignal, Turret, TurretError, TurretSettings};
use turret_hardware::{MaxColumnSum, SimCamera, SimLauncher, SimPlant, SimPlantParams};
use turret_traits::clock::{Clock, MonotonicClock};

/// A built turret plus whatever must outlive the run.
pub struct Rig {
    pub turret: Turret,
    pub backend: &'static str,
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    _button: Option<turret_hardware::gpio::StartStopButton>,
}

fn config_error(msg: String) -> eyre::Report {
    eyre::Report::new(TurretError::Config(msg))
}

/// Build the rig selected by the compiled back end and `[pins]`.
///
/// `signal` is raised by the hardware start button when one is configured.
pub fn assemble(
    cfg: &Config,
    settings: TurretSettings,
    sim_column: Option<usize>,
    signal: &StartStopSignal,
) -> Result<Rig> {
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        if cfg.pins.is_some() {
            return assemble_hardware(cfg, settings, sim_column, signal);
        }
        tracing::warn!("no [pins] section; using the simulated rig");
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        let _ = signal;
        if cfg.pins.is_some() {
            tracing::warn!("built without the `hardware` feature; [pins] ignored, using the simulated rig");
        }
    }
    assemble_sim(cfg, settings, sim_column)
}

/// Simulated camera; `sim_column` overrides `[sim] hot_column`.
fn sim_camera(
    cfg: &Config,
    clock: Arc<dyn Clock + Send + Sync>,
    sim_column: Option<usize>,
) -> Result<SimCamera> {
    let column = sim_column.unwrap_or(cfg.sim.hot_column);
    if column >= cfg.camera.width {
        return Err(config_error(format!(
            "sim column {column} is outside a {}-column frame",
            cfg.camera.width
        )));
    }
    Ok(SimCamera::new(clock)
        .with_size(cfg.camera.width, cfg.camera.height)
        .with_capture_time(Duration::from_millis(cfg.sim.capture_ms))
        .with_hot_column(column))
}

fn assemble_sim(cfg: &Config, settings: TurretSettings, sim_column: Option<usize>) -> Result<Rig> {
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let params = SimPlantParams {
        max_speed_ticks_per_s: cfg.sim.max_speed_ticks_per_s,
        time_constant_s: cfg.sim.time_constant_s,
        ..SimPlantParams::default()
    };
    let yaw = SimPlant::new(clock.clone(), params);
    let pitch = SimPlant::new(clock.clone(), params);
    let camera = sim_camera(cfg, clock.clone(), sim_column)?;
    let column = camera.target_handle().load(Ordering::Relaxed);
    let launcher = SimLauncher::new(clock.clone(), Duration::from_millis(cfg.launcher.pulse_ms));

    let turret = Turret::builder()
        .with_yaw(yaw.encoder(), yaw.pwm())
        .with_pitch(pitch.encoder(), pitch.pwm())
        .with_camera(camera)
        .with_extractor(MaxColumnSum)
        .with_launcher(launcher)
        .with_settings(settings)
        .with_clock(clock)
        .try_build()?;
    tracing::info!(backend = "sim", hot_column = column, "rig assembled");
    Ok(Rig {
        turret,
        backend: "sim",
        #[cfg(all(feature = "hardware", target_os = "linux"))]
        _button: None,
    })
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn assemble_hardware(
    cfg: &Config,
    settings: TurretSettings,
    sim_column: Option<usize>,
    signal: &StartStopSignal,
) -> Result<Rig> {
    use eyre::WrapErr;
    use turret_core::hw_error::map_hw_error;
    use turret_hardware::gpio::{GpioLauncher, QuadratureCounter, RppalMotor, StartStopButton};

    let Some(pins) = cfg.pins.as_ref() else {
        return Err(config_error("[pins] is required for the hardware rig".into()));
    };
    let hw = |e: turret_hardware::error::HwError| eyre::Report::new(map_hw_error(&e));

    let yaw_enc = QuadratureCounter::new(pins.yaw_enc_a, pins.yaw_enc_b)
        .map_err(hw)
        .wrap_err("open yaw encoder")?;
    let yaw_motor = RppalMotor::new(
        pins.yaw_forward,
        pins.yaw_reverse,
        pins.yaw_enable,
        pins.pwm_frequency_hz,
    )
    .map_err(hw)
    .wrap_err("open yaw motor pins")?;
    let pitch_enc = QuadratureCounter::new(pins.pitch_enc_a, pins.pitch_enc_b)
        .map_err(hw)
        .wrap_err("open pitch encoder")?;
    let pitch_motor = RppalMotor::new(
        pins.pitch_forward,
        pins.pitch_reverse,
        pins.pitch_enable,
        pins.pwm_frequency_hz,
    )
    .map_err(hw)
    .wrap_err("open pitch motor pins")?;
    let launcher = GpioLauncher::new(
        pins.launcher_arm,
        pins.launcher_trigger,
        Duration::from_millis(cfg.launcher.pulse_ms),
    )
    .map_err(hw)
    .wrap_err("open launcher pins")?;

    let button = match pins.button {
        Some(pin) => {
            let signal = signal.clone();
            Some(
                StartStopButton::new(pin, move || signal.raise())
                    .map_err(hw)
                    .wrap_err("open start button")?,
            )
        }
        None => None,
    };

    // No MLX90640 driver is wired in yet; frames come from the simulated
    // camera so the mechanics can still be exercised.
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let camera = sim_camera(cfg, clock.clone(), sim_column)?;
    tracing::warn!("thermal camera is simulated on the hardware rig");

    let turret = Turret::builder()
        .with_yaw(yaw_enc, yaw_motor)
        .with_pitch(pitch_enc, pitch_motor)
        .with_camera(camera)
        .with_extractor(MaxColumnSum)
        .with_launcher(launcher)
        .with_settings(settings)
        .with_clock(clock)
        .try_build()?;
    tracing::info!(backend = "hardware", "rig assembled");
    Ok(Rig {
        turret,
        backend: "hardware",
        _button: button,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn clock() -> Arc<dyn Clock + Send + Sync> {
        Arc::new(MonotonicClock::new())
    }

    #[rstest]
    #[case(None, 16)]
    #[case(Some(4), 4)]
    fn sim_camera_column_follows_override(#[case] sim_column: Option<usize>, #[case] expected: usize) {
        let cam = sim_camera(&Config::default(), clock(), sim_column).unwrap();
        assert_eq!(cam.target_handle().load(Ordering::Relaxed), expected);
    }

    #[rstest]
    fn sim_camera_rejects_column_outside_frame() {
        let Err(err) = sim_camera(&Config::default(), clock(), Some(32)) else {
            panic!("column 32 accepted");
        };
        assert!(err.to_string().contains("outside a 32-column frame"), "{err}");
    }
}
