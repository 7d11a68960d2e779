use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use turret_hardware::{MaxColumnSum, SimCamera, SimPlant, SimPlantParams};
use turret_traits::{Clock, EncoderCounter, FrameSource, HotColumn, ManualClock, PwmChannel, PwmOutput};

fn shared(c: &ManualClock) -> Arc<dyn Clock + Send + Sync> {
    Arc::new(c.clone())
}

#[test]
fn counter_wraps_like_a_16_bit_timer() {
    let mc = ManualClock::new();
    let plant = SimPlant::new(
        shared(&mc),
        SimPlantParams {
            invert_counter: false,
            ..SimPlantParams::default()
        },
    );
    let mut enc = plant.encoder();
    plant.set_position_ticks(65_530.0);
    assert_eq!(enc.counter().unwrap(), 65_530);
    plant.set_position_ticks(65_540.0);
    assert_eq!(enc.counter().unwrap(), 4);
}

#[test]
fn forward_channel_drives_negative() {
    let mc = ManualClock::new();
    let plant = SimPlant::new(shared(&mc), SimPlantParams::default());
    let mut pwm = plant.pwm();
    pwm.set_duty_cycle(PwmChannel::Forward, 80.0).unwrap();
    mc.advance(Duration::from_millis(300));
    assert!(plant.position_ticks() < -100.0);
    pwm.set_duty_cycle(PwmChannel::Forward, 0.0).unwrap();
    assert_eq!(plant.duty(), (0.0, 0.0));
}

#[test]
fn moving_target_is_seen_on_next_capture() {
    let mc = ManualClock::new();
    let mut cam = SimCamera::new(shared(&mc)).with_capture_time(Duration::from_millis(5));
    let target = cam.target_handle();
    let f1 = cam.capture(Duration::from_secs(1)).unwrap();
    assert_eq!(MaxColumnSum.hot_column(&f1), 16);
    target.store(3, Ordering::Relaxed);
    let f2 = cam.capture(Duration::from_secs(1)).unwrap();
    assert_eq!(MaxColumnSum.hot_column(&f2), 3);
}

#[test]
fn capture_slower_than_timeout_fails() {
    let mc = ManualClock::new();
    let mut cam = SimCamera::new(shared(&mc));
    assert!(cam.capture(Duration::from_millis(100)).is_err());
    assert_eq!(cam.captures(), 0);
}
