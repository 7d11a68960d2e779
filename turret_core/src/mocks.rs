//! Test and helper mocks for turret_core

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

use turret_traits::{EncoderCounter, PwmChannel, PwmOutput};

/// Encoder counter whose raw value is set from outside through a shared handle.
#[derive(Debug, Clone, Default)]
pub struct StaticCounter {
    raw: Arc<AtomicU16>,
}

impl StaticCounter {
    pub fn handle(&self) -> Arc<AtomicU16> {
        self.raw.clone()
    }
}

impl EncoderCounter for StaticCounter {
    fn counter(&mut self) -> Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.raw.load(Ordering::Relaxed))
    }
}

/// PWM output that records every duty-cycle write in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingPwm {
    log: Arc<Mutex<Vec<(PwmChannel, f64)>>>,
}

impl RecordingPwm {
    pub fn log(&self) -> Arc<Mutex<Vec<(PwmChannel, f64)>>> {
        self.log.clone()
    }
}

impl PwmOutput for RecordingPwm {
    fn set_duty_cycle(
        &mut self,
        channel: PwmChannel,
        percent: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut g = self
            .log
            .lock()
            .map_err(|_| std::io::Error::other("pwm log poisoned"))?;
        g.push((channel, percent));
        Ok(())
    }

    fn set_enabled(&mut self, _enabled: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// A PWM output that always errors; useful for fault-path tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingPwm;

impl PwmOutput for FailingPwm {
    fn set_duty_cycle(
        &mut self,
        _channel: PwmChannel,
        _percent: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("pwm driver fault")))
    }

    fn set_enabled(&mut self, _enabled: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}
