use std::time::Duration;

use rppal::gpio::OutputPin;
use turret_traits::Launcher;

use crate::error::HwError;

/// Flywheel relay on `arm`, solenoid pulse on `trigger`.
pub struct GpioLauncher {
    arm: OutputPin,
    trigger: OutputPin,
    pulse: Duration,
    armed: bool,
}

impl GpioLauncher {
    pub fn new(arm_pin: u8, trigger_pin: u8, pulse: Duration) -> Result<Self, HwError> {
        Ok(Self {
            arm: super::output_pin(arm_pin)?,
            trigger: super::output_pin(trigger_pin)?,
            pulse,
            armed: false,
        })
    }
}

impl Launcher for GpioLauncher {
    fn arm(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.arm.set_high();
        self.armed = true;
        Ok(())
    }

    fn disarm(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.arm.set_low();
        self.armed = false;
        Ok(())
    }

    fn fire(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !self.armed {
            tracing::warn!("fire requested while disarmed; ignoring");
            return Ok(());
        }
        self.trigger.set_high();
        std::thread::sleep(self.pulse);
        self.trigger.set_low();
        Ok(())
    }

    fn is_armed(&self) -> bool {
        self.armed
    }
}

impl Drop for GpioLauncher {
    fn drop(&mut self) {
        self.trigger.set_low();
        self.arm.set_low();
    }
}
