//! Raspberry Pi back ends built on `rppal`.
mod button;
mod launcher;
mod pwm;
mod quadrature;

pub use button::StartStopButton;
pub use launcher::GpioLauncher;
pub use pwm::RppalMotor;
pub use quadrature::QuadratureCounter;

use crate::error::HwError;

fn gpio() -> Result<rppal::gpio::Gpio, HwError> {
    rppal::gpio::Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))
}

fn output_pin(pin: u8) -> Result<rppal::gpio::OutputPin, HwError> {
    Ok(gpio()?
        .get(pin)
        .map_err(|e| HwError::Gpio(format!("pin {pin}: {e}")))?
        .into_output_low())
}

fn input_pullup(pin: u8) -> Result<rppal::gpio::InputPin, HwError> {
    Ok(gpio()?
        .get(pin)
        .map_err(|e| HwError::Gpio(format!("pin {pin}: {e}")))?
        .into_input_pullup())
}
