#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core turret control logic (hardware-agnostic).
//!
//! All hardware interactions go through the `turret_traits` seams
//! (`EncoderCounter`, `PwmOutput`, `FrameSource`, `HotColumn`, `Launcher`).
//!
//! ## Architecture
//!
//! - **Estimation**: 16-bit quadrature counter → unbounded position and
//!   windowed velocity (`encoder`)
//! - **Control**: PD law per axis (`controller`) driving an H-bridge through
//!   a saturating clamp (`motor`), bundled per axis in `axis`
//! - **Targeting**: hot column → yaw setpoint (`targeting`)
//! - **Scheduling**: deadline dispatch of retarget, fire and control on one
//!   thread (`scheduler`), driven by the outer loop in `runner`
//!
//! ## Time
//!
//! Deadlines are `u32` millisecond ticks compared with wrapping arithmetic
//! (`util`). Time is read through an injected `Clock`, so a whole run can
//! replay deterministically on `ManualClock`.

pub mod axis;
pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod encoder;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod motor;
pub mod runner;
pub mod scheduler;
pub mod signal;
pub mod status;
pub mod targeting;
pub mod util;

pub use axis::TurretAxis;
pub use builder::{Turret, TurretBuilder, build_scheduler};
pub use config::{AxisCfg, CameraCfg, LauncherCfg, TargetingCfg, TimingCfg, TurretSettings};
pub use controller::PdController;
pub use encoder::{CountDirection, EncoderEstimator, HISTORY_LEN};
pub use error::{BuildError, TurretError};
pub use motor::{MotorClamp, duty_split};
pub use runner::{DiagCommand, DiagReport, ExitReason, RunControl, RunOptions, RunOutcome};
pub use scheduler::{Scheduler, SchedulerState};
pub use signal::StartStopSignal;
pub use status::{Mode, Pass, RunStats};
pub use targeting::{Target, TargetingEstimator};
