use rppal::gpio::{InputPin, Level, Trigger};

use crate::error::HwError;

/// Active-low push button. `on_press` runs on the interrupt thread, so keep
/// it to a flag store.
pub struct StartStopButton {
    _pin: InputPin,
}

impl StartStopButton {
    pub fn new<F>(pin: u8, mut on_press: F) -> Result<Self, HwError>
    where
        F: FnMut() + Send + 'static,
    {
        let mut input = super::input_pullup(pin)?;
        input
            .set_async_interrupt(Trigger::FallingEdge, move |level: Level| {
                if level == Level::Low {
                    on_press();
                }
            })
            .map_err(|e| HwError::Gpio(format!("pin {pin}: {e}")))?;
        tracing::info!(pin, "start/stop button armed");
        Ok(Self { _pin: input })
    }
}
