//! One motorized axis: encoder estimator, PD controller and motor clamp.

use eyre::WrapErr;
use turret_traits::{EncoderCounter, PwmOutput};

use crate::config::AxisCfg;
use crate::controller::PdController;
use crate::encoder::EncoderEstimator;
use crate::error::Result;
use crate::hw_error::report;
use crate::motor::MotorClamp;

pub struct TurretAxis<E: EncoderCounter, P: PwmOutput> {
    name: &'static str,
    counter: E,
    estimator: EncoderEstimator,
    controller: PdController,
    motor: MotorClamp<P>,
    home_setpoint: f64,
    last_actuation: f64,
}

impl<E: EncoderCounter, P: PwmOutput> core::fmt::Debug for TurretAxis<E, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TurretAxis")
            .field("name", &self.name)
            .field("position", &self.estimator.position())
            .field("controller", &self.controller)
            .field("duty", &self.motor.duty())
            .finish()
    }
}

impl<E: EncoderCounter, P: PwmOutput> TurretAxis<E, P> {
    pub fn new(name: &'static str, counter: E, pwm: P, cfg: &AxisCfg) -> Self {
        let mut controller = PdController::new(cfg.kp, cfg.kd);
        controller.set_position_setpoint(cfg.position_setpoint);
        controller.set_velocity_setpoint(cfg.velocity_setpoint);
        Self {
            name,
            counter,
            estimator: EncoderEstimator::new(cfg.counts_per_rev, cfg.direction),
            controller,
            motor: MotorClamp::new(pwm),
            home_setpoint: cfg.position_setpoint,
            last_actuation: 0.0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Position setpoint the axis was configured with.
    pub fn home_setpoint(&self) -> f64 {
        self.home_setpoint
    }

    /// Re-reference the encoder at the current shaft position.
    pub fn zero(&mut self) -> Result<()> {
        let raw = self.read_raw()?;
        self.estimator.zero(raw);
        Ok(())
    }

    /// Read the counter and fold it into the estimator.
    pub fn sample(&mut self, now_us: u64) -> Result<i64> {
        let raw = self.read_raw()?;
        Ok(self.estimator.update(raw, now_us))
    }

    /// Sample, run the PD law on radians, drive the motor. Returns the
    /// unclamped actuation.
    ///
    /// Velocity counts as zero until the estimator window is full.
    pub fn control_step(&mut self, now_us: u64) -> Result<f64> {
        self.sample(now_us)?;
        let pos = self.estimator.position_radians();
        let vel = self.estimator.velocity_radians().unwrap_or(0.0);
        let actuation = self.controller.run(pos, vel);
        self.motor
            .apply(actuation)
            .wrap_err_with(|| format!("{} motor", self.name))?;
        self.last_actuation = actuation;
        tracing::trace!(axis = self.name, pos, vel, actuation, "control");
        Ok(actuation)
    }

    /// Neutral outputs on both channels.
    pub fn stop(&mut self) -> Result<()> {
        self.last_actuation = 0.0;
        self.motor
            .zero()
            .wrap_err_with(|| format!("{} motor stop", self.name))
    }

    pub fn enable(&mut self, on: bool) -> Result<()> {
        self.motor.enable(on)
    }

    pub fn controller(&self) -> &PdController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PdController {
        &mut self.controller
    }

    pub fn estimator(&self) -> &EncoderEstimator {
        &self.estimator
    }

    pub fn position_radians(&self) -> f64 {
        self.estimator.position_radians()
    }

    pub fn last_actuation(&self) -> f64 {
        self.last_actuation
    }

    pub fn duty(&self) -> (f64, f64) {
        self.motor.duty()
    }

    fn read_raw(&mut self) -> Result<u16> {
        self.counter
            .counter()
            .map_err(report)
            .wrap_err_with(|| format!("{} encoder", self.name))
    }
}
