#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary TOML must either fail to parse or validate without panicking.
    if let Ok(cfg) = toml::from_str::<turret_config::Config>(data) {
        if cfg.validate().is_ok() {
            // A valid document keeps the invariants the scheduler relies on.
            assert!(cfg.timing.fire_arm_grace_ms > cfg.timing.retarget_period_ms);
            assert!(cfg.sim.hot_column < cfg.camera.width);
        }
    }
});
