//! Hardware seams for the turret controller.
//!
//! Every device the control loop touches is reached through one of these
//! traits. Errors cross the boundary as `Box<dyn Error + Send + Sync>` so
//! back ends can carry their own error types; `turret_core` maps them to
//! typed errors.
pub mod clock;
pub mod frame;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use frame::{MLX90640_HEIGHT, MLX90640_WIDTH, ThermalFrame};

use std::error::Error;
use std::time::Duration;

/// Free-running 16-bit quadrature counter (hardware timer in encoder mode).
pub trait EncoderCounter {
    fn counter(&mut self) -> Result<u16, Box<dyn Error + Send + Sync>>;
}

/// One of the two PWM inputs of an H-bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PwmChannel {
    Forward,
    Reverse,
}

/// Two-channel PWM output driving one motor.
pub trait PwmOutput {
    /// Set the duty cycle of one channel, `percent` in `[0, 100]`.
    fn set_duty_cycle(
        &mut self,
        channel: PwmChannel,
        percent: f64,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Drive the bridge enable line.
    fn set_enabled(&mut self, enabled: bool) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Thermal camera. `capture` blocks for the full exposure (~500 ms on the
/// reference camera) and should give up after `timeout`.
pub trait FrameSource {
    fn capture(&mut self, timeout: Duration) -> Result<ThermalFrame, Box<dyn Error + Send + Sync>>;
}

/// Picks the column holding the target in a thermal frame.
pub trait HotColumn {
    fn hot_column(&self, frame: &ThermalFrame) -> usize;
}

/// Projectile launcher: arm spins the flywheels, fire pushes one dart.
pub trait Launcher {
    fn arm(&mut self) -> Result<(), Box<dyn Error + Send + Sync>>;
    fn disarm(&mut self) -> Result<(), Box<dyn Error + Send + Sync>>;
    /// Fire once. Firing while disarmed is a no-op for the hardware.
    fn fire(&mut self) -> Result<(), Box<dyn Error + Send + Sync>>;
    fn is_armed(&self) -> bool;
}

impl<T: EncoderCounter + ?Sized> EncoderCounter for Box<T> {
    fn counter(&mut self) -> Result<u16, Box<dyn Error + Send + Sync>> {
        (**self).counter()
    }
}

impl<T: PwmOutput + ?Sized> PwmOutput for Box<T> {
    fn set_duty_cycle(
        &mut self,
        channel: PwmChannel,
        percent: f64,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        (**self).set_duty_cycle(channel, percent)
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), Box<dyn Error + Send + Sync>> {
        (**self).set_enabled(enabled)
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn capture(&mut self, timeout: Duration) -> Result<ThermalFrame, Box<dyn Error + Send + Sync>> {
        (**self).capture(timeout)
    }
}

impl<T: HotColumn + ?Sized> HotColumn for Box<T> {
    fn hot_column(&self, frame: &ThermalFrame) -> usize {
        (**self).hot_column(frame)
    }
}

impl<T: Launcher + ?Sized> Launcher for Box<T> {
    fn arm(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        (**self).arm()
    }
    fn disarm(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        (**self).disarm()
    }
    fn fire(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        (**self).fire()
    }
    fn is_armed(&self) -> bool {
        (**self).is_armed()
    }
}
