//! Device back ends for the turret: a deterministic simulation and, behind
//! the `hardware` feature, Raspberry Pi GPIO/PWM drivers via `rppal`.
pub mod column;
pub mod error;
pub mod sim;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

pub use column::MaxColumnSum;
pub use sim::{
    LauncherEvent, SimCamera, SimEncoder, SimLauncher, SimPlant, SimPlantParams, SimPwm,
};
