//! Signed actuation to H-bridge duty cycles.

use turret_traits::{PwmChannel, PwmOutput};

use crate::error::Result;
use crate::hw_error::report;
use eyre::WrapErr;

/// Saturation limit of the actuation, in percent duty.
pub const MAX_DUTY: f64 = 100.0;

/// Split a signed actuation into `(forward, reverse)` duty percentages.
///
/// Positive actuation drives the reverse channel, zero or negative drives
/// forward. At most one channel is non-zero; NaN maps to neutral.
#[inline]
pub fn duty_split(actuation: f64) -> (f64, f64) {
    let a = if actuation.is_nan() {
        0.0
    } else {
        actuation.clamp(-MAX_DUTY, MAX_DUTY)
    };
    if a > 0.0 { (0.0, a) } else { (a.abs(), 0.0) }
}

/// Motor output with clamping; never drives both channels.
#[derive(Debug)]
pub struct MotorClamp<P: PwmOutput> {
    pwm: P,
    duty: (f64, f64),
}

impl<P: PwmOutput> MotorClamp<P> {
    pub fn new(pwm: P) -> Self {
        Self {
            pwm,
            duty: (0.0, 0.0),
        }
    }

    /// Drive the motor with a signed actuation.
    pub fn apply(&mut self, actuation: f64) -> Result<()> {
        let (fwd, rev) = duty_split(actuation);
        // Release the channel going idle first so both are never high together.
        if fwd == 0.0 {
            self.set(PwmChannel::Forward, fwd)?;
            self.set(PwmChannel::Reverse, rev)?;
        } else {
            self.set(PwmChannel::Reverse, rev)?;
            self.set(PwmChannel::Forward, fwd)?;
        }
        Ok(())
    }

    /// Both channels to zero duty.
    pub fn zero(&mut self) -> Result<()> {
        self.set(PwmChannel::Forward, 0.0)?;
        self.set(PwmChannel::Reverse, 0.0)
    }

    pub fn enable(&mut self, on: bool) -> Result<()> {
        self.pwm
            .set_enabled(on)
            .map_err(report)
            .wrap_err("motor enable")
    }

    /// Last commanded `(forward, reverse)` duty.
    pub fn duty(&self) -> (f64, f64) {
        self.duty
    }

    fn set(&mut self, ch: PwmChannel, percent: f64) -> Result<()> {
        self.pwm
            .set_duty_cycle(ch, percent)
            .map_err(report)
            .wrap_err("set_duty_cycle")?;
        match ch {
            PwmChannel::Forward => self.duty.0 = percent,
            PwmChannel::Reverse => self.duty.1 = percent,
        }
        Ok(())
    }
}
