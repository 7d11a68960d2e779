//! Deterministic simulation back end.
//!
//! All devices take a shared `Clock`; with `ManualClock` a whole turret run
//! can be replayed without sleeping. Blocking device calls (frame capture,
//! fire pulse) consume time through `Clock::sleep`, so simulated time moves
//! exactly as it would on hardware.
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use turret_traits::{
    Clock, EncoderCounter, FrameSource, Launcher, PwmChannel, PwmOutput, ThermalFrame,
};

use crate::error::HwError;

/// Physical parameters of a simulated motor + encoder.
#[derive(Debug, Clone, Copy)]
pub struct SimPlantParams {
    /// Shaft speed at 100 % duty, in encoder ticks per second.
    pub max_speed_ticks_per_s: f64,
    /// First-order time constant of the motor response.
    pub time_constant_s: f64,
    /// Counter runs opposite to positive drive (reference wiring).
    pub invert_counter: bool,
}

impl Default for SimPlantParams {
    fn default() -> Self {
        Self {
            max_speed_ticks_per_s: 4_000.0,
            time_constant_s: 0.05,
            invert_counter: true,
        }
    }
}

#[derive(Debug)]
struct PlantState {
    position: f64,
    velocity: f64,
    forward: f64,
    reverse: f64,
    enabled: bool,
    last: Instant,
}

/// A DC motor with a quadrature encoder on its shaft.
#[derive(Clone)]
pub struct SimPlant {
    state: Arc<Mutex<PlantState>>,
    params: SimPlantParams,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl core::fmt::Debug for SimPlant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimPlant")
            .field("position_ticks", &self.position_ticks())
            .field("params", &self.params)
            .finish()
    }
}

impl SimPlant {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>, params: SimPlantParams) -> Self {
        let last = clock.now();
        Self {
            state: Arc::new(Mutex::new(PlantState {
                position: 0.0,
                velocity: 0.0,
                forward: 0.0,
                reverse: 0.0,
                enabled: true,
                last,
            })),
            params,
            clock,
        }
    }

    /// Encoder handle reading this plant's shaft.
    pub fn encoder(&self) -> SimEncoder {
        SimEncoder {
            plant: self.clone(),
        }
    }

    /// PWM handle driving this plant's motor.
    pub fn pwm(&self) -> SimPwm {
        SimPwm {
            plant: self.clone(),
        }
    }

    /// Shaft position in ticks, positive in the direction of positive drive.
    pub fn position_ticks(&self) -> f64 {
        let mut st = self.lock();
        self.integrate(&mut st);
        st.position
    }

    /// Move the shaft by hand (e.g. to seed a wrap test).
    pub fn set_position_ticks(&self, ticks: f64) {
        let mut st = self.lock();
        self.integrate(&mut st);
        st.position = ticks;
    }

    /// Current (forward, reverse) duty cycles in percent.
    pub fn duty(&self) -> (f64, f64) {
        let st = self.lock();
        (st.forward, st.reverse)
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    fn lock(&self) -> MutexGuard<'_, PlantState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn integrate(&self, st: &mut PlantState) {
        let now = self.clock.now();
        let mut remaining = now.saturating_duration_since(st.last).as_secs_f64();
        st.last = now;
        let drive = if st.enabled {
            (st.reverse - st.forward) / 100.0
        } else {
            0.0
        };
        let target = drive * self.params.max_speed_ticks_per_s;
        let tau = self.params.time_constant_s.max(1e-6);
        // 1 ms sub-steps keep the explicit Euler update stable for long gaps.
        while remaining > 0.0 {
            let h = remaining.min(0.001);
            st.velocity += (target - st.velocity) * (h / tau).min(1.0);
            st.position += st.velocity * h;
            remaining -= h;
        }
    }

    fn raw_counter(&self) -> u16 {
        let ticks = self.position_ticks().round() as i64;
        let signed = if self.params.invert_counter {
            -ticks
        } else {
            ticks
        };
        signed.rem_euclid(1 << 16) as u16
    }
}

/// Simulated 16-bit encoder timer.
#[derive(Debug, Clone)]
pub struct SimEncoder {
    plant: SimPlant,
}

impl EncoderCounter for SimEncoder {
    fn counter(&mut self) -> Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.plant.raw_counter())
    }
}

/// Simulated H-bridge PWM pair.
#[derive(Debug, Clone)]
pub struct SimPwm {
    plant: SimPlant,
}

impl PwmOutput for SimPwm {
    fn set_duty_cycle(
        &mut self,
        channel: PwmChannel,
        percent: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(Box::new(HwError::InvalidDuty(percent)));
        }
        let mut st = self.plant.lock();
        self.plant.integrate(&mut st);
        match channel {
            PwmChannel::Forward => st.forward = percent,
            PwmChannel::Reverse => st.reverse = percent,
        }
        Ok(())
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut st = self.plant.lock();
        self.plant.integrate(&mut st);
        st.enabled = enabled;
        Ok(())
    }
}

/// Simulated thermal camera rendering one hot column on a cool background.
#[derive(Clone)]
pub struct SimCamera {
    clock: Arc<dyn Clock + Send + Sync>,
    width: usize,
    height: usize,
    capture_time: Duration,
    hot_column: Arc<AtomicUsize>,
    stalled: Arc<AtomicBool>,
    captures: Arc<AtomicU32>,
}

impl SimCamera {
    const AMBIENT: f32 = 22.0;
    const NEIGHBOUR: f32 = 29.0;
    const TARGET: f32 = 36.0;

    /// 32x24 camera taking 500 ms per capture, target in the middle column.
    pub fn new(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            clock,
            width: turret_traits::MLX90640_WIDTH,
            height: turret_traits::MLX90640_HEIGHT,
            capture_time: Duration::from_millis(500),
            hot_column: Arc::new(AtomicUsize::new(turret_traits::MLX90640_WIDTH / 2)),
            stalled: Arc::new(AtomicBool::new(false)),
            captures: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn with_size(mut self, width: usize, height: usize) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    pub fn with_capture_time(mut self, d: Duration) -> Self {
        self.capture_time = d;
        self
    }

    pub fn with_hot_column(self, col: usize) -> Self {
        self.hot_column.store(col, Ordering::Relaxed);
        self
    }

    /// Shared handle to move the target between captures.
    pub fn target_handle(&self) -> Arc<AtomicUsize> {
        self.hot_column.clone()
    }

    /// Shared handle that makes every capture hang until its timeout.
    pub fn stall_handle(&self) -> Arc<AtomicBool> {
        self.stalled.clone()
    }

    /// Number of completed captures.
    pub fn captures(&self) -> u32 {
        self.captures.load(Ordering::Relaxed)
    }

    fn render(&self) -> Option<ThermalFrame> {
        let hot = self.hot_column.load(Ordering::Relaxed).min(self.width - 1);
        let mut pixels = Vec::with_capacity(self.width * self.height);
        for _row in 0..self.height {
            for col in 0..self.width {
                let v = if col == hot {
                    Self::TARGET
                } else if col.abs_diff(hot) == 1 {
                    Self::NEIGHBOUR
                } else {
                    Self::AMBIENT
                };
                pixels.push(v);
            }
        }
        ThermalFrame::from_pixels(self.width, self.height, pixels)
    }
}

impl FrameSource for SimCamera {
    fn capture(
        &mut self,
        timeout: Duration,
    ) -> Result<ThermalFrame, Box<dyn std::error::Error + Send + Sync>> {
        if self.stalled.load(Ordering::Relaxed) || self.capture_time > timeout {
            self.clock.sleep(timeout);
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "sim camera timed out");
            return Err(Box::new(HwError::Timeout));
        }
        self.clock.sleep(self.capture_time);
        let frame = self
            .render()
            .ok_or_else(|| HwError::Gpio("sim camera produced an invalid frame".into()))?;
        self.captures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(
            hot_column = self.hot_column.load(Ordering::Relaxed),
            "sim camera capture"
        );
        Ok(frame)
    }
}

/// What a simulated launcher was asked to do, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LauncherEvent {
    Armed,
    Disarmed,
    Fired,
    /// Fire requested while disarmed; nothing left the barrel.
    MisFire,
}

/// Simulated launcher recording every command.
#[derive(Clone)]
pub struct SimLauncher {
    clock: Arc<dyn Clock + Send + Sync>,
    pulse: Duration,
    armed: bool,
    events: Arc<Mutex<Vec<LauncherEvent>>>,
}

impl SimLauncher {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>, pulse: Duration) -> Self {
        Self {
            clock,
            pulse,
            armed: false,
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared event log (clone before handing the launcher to the turret).
    pub fn events_handle(&self) -> Arc<Mutex<Vec<LauncherEvent>>> {
        self.events.clone()
    }

    pub fn events(&self) -> Vec<LauncherEvent> {
        self.events
            .lock()
            .map(|g| g.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    /// Darts actually fired.
    pub fn shots(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| **e == LauncherEvent::Fired)
            .count()
    }

    fn record(&self, ev: LauncherEvent) {
        let mut g = self.events.lock().unwrap_or_else(|e| e.into_inner());
        g.push(ev);
    }
}

impl Launcher for SimLauncher {
    fn arm(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.armed = true;
        self.record(LauncherEvent::Armed);
        tracing::debug!("sim launcher armed");
        Ok(())
    }

    fn disarm(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.armed = false;
        self.record(LauncherEvent::Disarmed);
        tracing::debug!("sim launcher disarmed");
        Ok(())
    }

    fn fire(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !self.armed {
            tracing::warn!("fire requested while disarmed; ignoring");
            self.record(LauncherEvent::MisFire);
            return Ok(());
        }
        self.clock.sleep(self.pulse);
        self.record(LauncherEvent::Fired);
        Ok(())
    }

    fn is_armed(&self) -> bool {
        self.armed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use turret_traits::{HotColumn, ManualClock};

    fn clock() -> (ManualClock, Arc<dyn Clock + Send + Sync>) {
        let c = ManualClock::new();
        let shared: Arc<dyn Clock + Send + Sync> = Arc::new(c.clone());
        (c, shared)
    }

    #[test]
    fn plant_moves_with_reverse_channel_and_counter_runs_backwards() {
        let (mc, clk) = clock();
        let plant = SimPlant::new(clk, SimPlantParams::default());
        let mut pwm = plant.pwm();
        let mut enc = plant.encoder();
        pwm.set_duty_cycle(PwmChannel::Reverse, 50.0).unwrap();
        mc.advance(Duration::from_millis(200));
        let pos = plant.position_ticks();
        assert!(pos > 0.0, "expected forward motion, got {pos}");
        let raw = enc.counter().unwrap();
        // Inverted wiring: counter decreases from 0 and wraps below zero.
        assert!(raw > 32_768, "raw counter should have wrapped, got {raw}");
    }

    #[test]
    fn disabled_bridge_does_not_drive() {
        let (mc, clk) = clock();
        let plant = SimPlant::new(clk, SimPlantParams::default());
        let mut pwm = plant.pwm();
        pwm.set_enabled(false).unwrap();
        assert!(!plant.is_enabled());
        pwm.set_duty_cycle(PwmChannel::Forward, 100.0).unwrap();
        mc.advance(Duration::from_millis(100));
        assert_eq!(plant.position_ticks(), 0.0);
    }

    #[rstest]
    #[case(-0.5)]
    #[case(100.5)]
    fn rejects_out_of_range_duty(#[case] duty: f64) {
        let (_mc, clk) = clock();
        let plant = SimPlant::new(clk, SimPlantParams::default());
        assert!(plant.pwm().set_duty_cycle(PwmChannel::Forward, duty).is_err());
    }

    #[test]
    fn camera_capture_consumes_time_and_renders_target() {
        let (mc, clk) = clock();
        let mut cam = SimCamera::new(clk).with_hot_column(10);
        let t0 = mc.offset();
        let frame = cam.capture(Duration::from_secs(2)).unwrap();
        assert_eq!(mc.offset() - t0, Duration::from_millis(500));
        assert_eq!(frame.width(), 32);
        assert_eq!(frame.height(), 24);
        assert_eq!(
            crate::MaxColumnSum.hot_column(&frame),
            10,
            "rendered target column"
        );
        assert_eq!(cam.captures(), 1);
    }

    #[test]
    fn stalled_camera_times_out() {
        let (mc, clk) = clock();
        let mut cam = SimCamera::new(clk);
        cam.stall_handle().store(true, Ordering::Relaxed);
        let err = cam.capture(Duration::from_millis(800)).unwrap_err();
        assert!(err.to_string().contains("timeout"));
        assert_eq!(mc.offset(), Duration::from_millis(800));
    }

    #[test]
    fn launcher_only_fires_when_armed() {
        let (_mc, clk) = clock();
        let mut l = SimLauncher::new(clk, Duration::from_millis(50));
        l.fire().unwrap();
        l.arm().unwrap();
        l.fire().unwrap();
        l.disarm().unwrap();
        assert_eq!(
            l.events(),
            vec![
                LauncherEvent::MisFire,
                LauncherEvent::Armed,
                LauncherEvent::Fired,
                LauncherEvent::Disarmed
            ]
        );
        assert_eq!(l.shots(), 1);
    }
}
