//! Quadrature encoder position/velocity estimator.
//!
//! Turns samples of a free-running 16-bit hardware counter into an unbounded
//! signed position. Any raw jump larger than half the counter range is taken
//! as a wrap, so the counter must be sampled at least once per half
//! revolution of the counter range (32768 ticks).

use std::collections::VecDeque;
use std::f64::consts::TAU;

/// Number of `(timestamp, count)` samples the velocity window spans.
pub const HISTORY_LEN: usize = 5;

const HALF_RANGE: i32 = 1 << 15;
const FULL_RANGE: i32 = 1 << 16;

/// Sign relating raw counter increments to positive position.
///
/// The reference wiring counts down for positive motor drive, so `Down` is
/// the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountDirection {
    Up,
    #[default]
    Down,
}

impl CountDirection {
    #[inline]
    fn sign(self) -> i64 {
        match self {
            CountDirection::Up => 1,
            CountDirection::Down => -1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EncoderEstimator {
    prev_raw: u16,
    count: i64,
    history: VecDeque<(u64, i64)>,
    counts_per_rev: u32,
    direction: CountDirection,
}

impl EncoderEstimator {
    /// `counts_per_rev` is lines × 4 (quadrature); clamped to at least 1.
    pub fn new(counts_per_rev: u32, direction: CountDirection) -> Self {
        Self {
            prev_raw: 0,
            count: 0,
            history: VecDeque::with_capacity(HISTORY_LEN),
            counts_per_rev: counts_per_rev.max(1),
            direction,
        }
    }

    /// Fold a new raw counter sample taken at `now_us` into the position.
    ///
    /// Returns the accumulated count.
    pub fn update(&mut self, raw: u16, now_us: u64) -> i64 {
        let mut delta = i32::from(raw) - i32::from(self.prev_raw);
        if delta > HALF_RANGE {
            delta -= FULL_RANGE;
        } else if delta < -HALF_RANGE {
            delta += FULL_RANGE;
        }
        self.prev_raw = raw;
        self.count += self.direction.sign() * i64::from(delta);

        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back((now_us, self.count));
        self.count
    }

    /// Re-reference position to zero at the counter value `raw`.
    ///
    /// Velocity history is cleared as well, so `velocity()` stays unavailable
    /// until a fresh window has been collected.
    pub fn zero(&mut self, raw: u16) {
        self.count = 0;
        self.prev_raw = raw;
        self.history.clear();
    }

    #[inline]
    pub fn position(&self) -> i64 {
        self.count
    }

    pub fn position_radians(&self) -> f64 {
        self.to_radians(self.count as f64)
    }

    /// Ticks per second over the history window.
    ///
    /// `None` until `HISTORY_LEN` samples have been recorded since the last
    /// `zero()`, or when all samples share one timestamp.
    pub fn velocity(&self) -> Option<f64> {
        if self.history.len() < HISTORY_LEN {
            return None;
        }
        let (t0, c0) = *self.history.front()?;
        let (t1, c1) = *self.history.back()?;
        let dt_us = t1.checked_sub(t0).filter(|dt| *dt > 0)?;
        Some((c1 - c0) as f64 * 1e6 / dt_us as f64)
    }

    pub fn velocity_radians(&self) -> Option<f64> {
        self.velocity().map(|v| self.to_radians(v))
    }

    pub fn samples(&self) -> usize {
        self.history.len()
    }

    pub fn counts_per_rev(&self) -> u32 {
        self.counts_per_rev
    }

    #[inline]
    fn to_radians(&self, ticks: f64) -> f64 {
        ticks * TAU / f64::from(self.counts_per_rev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(CountDirection::Down, 10, -10)]
    #[case(CountDirection::Up, 10, 10)]
    fn direction_sets_sign(#[case] dir: CountDirection, #[case] raw: u16, #[case] want: i64) {
        let mut e = EncoderEstimator::new(1024, dir);
        assert_eq!(e.update(raw, 0), want);
    }

    #[test]
    fn forward_wrap_is_continuous() {
        let mut e = EncoderEstimator::new(1024, CountDirection::Up);
        e.zero(65_530);
        assert_eq!(e.update(4, 1_000), 10);
        assert_eq!(e.update(65_534, 2_000), 4);
    }

    #[test]
    fn zero_then_position_is_zero() {
        let mut e = EncoderEstimator::new(1024, CountDirection::Down);
        e.update(1234, 0);
        e.zero(1234);
        assert_eq!(e.position(), 0);
        assert_eq!(e.samples(), 0);
        assert_eq!(e.update(1234, 10), 0);
    }

    #[test]
    fn velocity_needs_full_window() {
        let mut e = EncoderEstimator::new(1024, CountDirection::Up);
        for i in 0..4u16 {
            e.update(i * 10, u64::from(i) * 10_000);
            assert!(e.velocity().is_none());
        }
        e.update(40, 40_000);
        // 40 ticks over 40 ms
        let v = e.velocity().unwrap();
        assert!((v - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn velocity_none_when_time_stands_still() {
        let mut e = EncoderEstimator::new(1024, CountDirection::Up);
        for i in 0..5u16 {
            e.update(i, 7);
        }
        assert!(e.velocity().is_none());
    }

    #[test]
    fn radians_use_counts_per_rev() {
        let mut e = EncoderEstimator::new(1024, CountDirection::Up);
        e.update(512, 0);
        assert!((e.position_radians() - std::f64::consts::PI).abs() < 1e-12);
    }
}
