use rppal::gpio::OutputPin;
use turret_traits::{PwmChannel, PwmOutput};

use crate::error::HwError;

/// H-bridge with software PWM on two GPIO lines plus an enable line.
///
/// The Pi only has two hardware PWM channels and the turret needs four
/// outputs, so every bridge input is a plain GPIO pin driven by rppal's
/// software PWM thread.
pub struct RppalMotor {
    forward: OutputPin,
    reverse: OutputPin,
    enable: OutputPin,
    frequency_hz: f64,
}

impl RppalMotor {
    pub fn new(
        forward_pin: u8,
        reverse_pin: u8,
        enable_pin: u8,
        frequency_hz: f64,
    ) -> Result<Self, HwError> {
        let mut forward = super::output_pin(forward_pin)?;
        let mut reverse = super::output_pin(reverse_pin)?;
        let enable = super::output_pin(enable_pin)?;
        for (pin, out) in [(forward_pin, &mut forward), (reverse_pin, &mut reverse)] {
            out.set_pwm_frequency(frequency_hz, 0.0)
                .map_err(|e| HwError::Pwm(format!("pin {pin}: {e}")))?;
        }
        tracing::info!(
            forward_pin,
            reverse_pin,
            enable_pin,
            frequency_hz,
            "motor bridge ready"
        );
        Ok(Self {
            forward,
            reverse,
            enable,
            frequency_hz,
        })
    }
}

impl PwmOutput for RppalMotor {
    fn set_duty_cycle(
        &mut self,
        channel: PwmChannel,
        percent: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(Box::new(HwError::InvalidDuty(percent)));
        }
        let pin = match channel {
            PwmChannel::Forward => &mut self.forward,
            PwmChannel::Reverse => &mut self.reverse,
        };
        pin.set_pwm_frequency(self.frequency_hz, percent / 100.0)
            .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> {
                Box::new(HwError::Pwm(e.to_string()))
            })
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if enabled {
            self.enable.set_high();
        } else {
            self.enable.set_low();
        }
        Ok(())
    }
}

impl Drop for RppalMotor {
    fn drop(&mut self) {
        let _ = self.forward.clear_pwm();
        let _ = self.reverse.clear_pwm();
        self.forward.set_low();
        self.reverse.set_low();
        self.enable.set_low();
    }
}
