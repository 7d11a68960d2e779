use std::sync::Arc;
use std::time::Duration;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use turret_core::{EncoderEstimator, CountDirection, PdController, Turret, duty_split};
use turret_hardware::{MaxColumnSum, SimCamera, SimLauncher, SimPlant, SimPlantParams};
use turret_traits::{Clock, ManualClock};

fn tracking_turret() -> (ManualClock, Turret) {
    let clock = ManualClock::new();
    let shared: Arc<dyn Clock + Send + Sync> = Arc::new(clock.clone());
    let yaw = SimPlant::new(shared.clone(), SimPlantParams::default());
    let pitch = SimPlant::new(shared.clone(), SimPlantParams::default());
    let mut turret = Turret::builder()
        .with_yaw(yaw.encoder(), yaw.pwm())
        .with_pitch(pitch.encoder(), pitch.pwm())
        .with_camera(SimCamera::new(shared.clone()).with_hot_column(10))
        .with_extractor(MaxColumnSum)
        .with_launcher(SimLauncher::new(shared.clone(), Duration::from_millis(50)))
        .with_clock(shared)
        .try_build()
        .expect("build");
    turret.start().expect("start");
    (clock, turret)
}

fn bench_control_pass(c: &mut Criterion) {
    let (clock, mut turret) = tracking_turret();
    c.bench_function("control_pass_two_axes", |b| {
        b.iter(|| {
            clock.advance(Duration::from_millis(10));
            turret.control().expect("control");
        })
    });
}

fn bench_estimator(c: &mut Criterion) {
    c.bench_function("encoder_update_and_velocity", |b| {
        let mut e = EncoderEstimator::new(1024, CountDirection::Down);
        let mut raw: u16 = 0;
        let mut t: u64 = 0;
        b.iter(|| {
            raw = raw.wrapping_add(37);
            t += 10_000;
            e.update(black_box(raw), t);
            black_box(e.velocity_radians())
        })
    });
}

fn bench_pd_and_clamp(c: &mut Criterion) {
    let mut pd = PdController::new(60.0, 0.1);
    pd.set_position_setpoint(123.503);
    c.bench_function("pd_run_and_split", |b| {
        b.iter(|| duty_split(pd.run(black_box(100.0), black_box(12.0))))
    });
}

criterion_group!(benches, bench_control_pass, bench_estimator, bench_pd_and_clamp);
criterion_main!(benches);
