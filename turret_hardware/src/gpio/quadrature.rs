use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU16, Ordering};

use rppal::gpio::{InputPin, Level, Trigger};
use turret_traits::EncoderCounter;

use crate::error::HwError;

/// Gray-code transition table indexed by `(prev << 2) | next`.
const TRANSITIONS: [i8; 16] = [0, -1, 1, 0, 1, 0, 0, -1, -1, 0, 0, 1, 0, 1, -1, 0];

/// Software 16-bit quadrature counter fed by edge interrupts on channels A/B.
///
/// Wraps like a hardware timer in encoder mode so the estimator sees the
/// same raw signal either way.
pub struct QuadratureCounter {
    count: Arc<AtomicU16>,
    _a: InputPin,
    _b: InputPin,
}

impl QuadratureCounter {
    pub fn new(pin_a: u8, pin_b: u8) -> Result<Self, HwError> {
        let mut a = super::input_pullup(pin_a)?;
        let mut b = super::input_pullup(pin_b)?;
        let initial = (level_bit(a.read()) << 1) | level_bit(b.read());
        let state = Arc::new(AtomicU8::new(initial));
        let count = Arc::new(AtomicU16::new(0));

        {
            let state = state.clone();
            let count = count.clone();
            a.set_async_interrupt(Trigger::Both, move |level: Level| {
                let bit = level_bit(level) << 1;
                step(&state, &count, |prev| bit | (prev & 0b01));
            })
            .map_err(|e| HwError::Gpio(format!("pin {pin_a}: {e}")))?;
        }
        {
            let state = state.clone();
            let count = count.clone();
            b.set_async_interrupt(Trigger::Both, move |level: Level| {
                let bit = level_bit(level);
                step(&state, &count, |prev| (prev & 0b10) | bit);
            })
            .map_err(|e| HwError::Gpio(format!("pin {pin_b}: {e}")))?;
        }

        tracing::info!(pin_a, pin_b, "quadrature counter ready");
        Ok(Self {
            count,
            _a: a,
            _b: b,
        })
    }
}

fn level_bit(l: Level) -> u8 {
    match l {
        Level::High => 1,
        Level::Low => 0,
    }
}

/// Swap in the new line state and count the transition from the state it
/// replaced. The A and B handlers run on separate threads, so the swap must
/// be a single atomic read-modify-write.
fn step(state: &AtomicU8, count: &AtomicU16, next: impl Fn(u8) -> u8) {
    let prev = match state.fetch_update(Ordering::AcqRel, Ordering::Acquire, |p| Some(next(p))) {
        Ok(p) | Err(p) => p,
    };
    count_transition(count, prev, next(prev));
}

fn count_transition(count: &AtomicU16, prev: u8, next: u8) {
    match TRANSITIONS[(((prev & 0b11) << 2) | (next & 0b11)) as usize] {
        1 => {
            count.fetch_add(1, Ordering::AcqRel);
        }
        -1 => {
            count.fetch_sub(1, Ordering::AcqRel);
        }
        _ => {}
    }
}

impl EncoderCounter for QuadratureCounter {
    fn counter(&mut self) -> Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.count.load(Ordering::Acquire))
    }
}
