//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "turret", version, about = "Thermal-tracking turret controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/turret.toml")]
    pub config: PathBuf,

    /// Optional targeting calibration CSV (headers: column,angle)
    #[arg(long, value_name = "FILE")]
    pub calibration: Option<PathBuf>,

    /// Log as JSON lines and print results as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Track and fire until interrupted
    Run {
        /// Simulated target column (sim back end only; overrides [sim].hot_column)
        #[arg(long, value_name = "N")]
        sim_column: Option<usize>,
        /// Stop after this many milliseconds (overrides [runner].max_run_ms)
        #[arg(long, value_name = "MS")]
        max_run_ms: Option<u64>,
        /// Start tracking immediately instead of waiting for a start press
        #[arg(long, action = ArgAction::SetTrue)]
        start: bool,
        /// Exit on a stop press instead of returning to idle
        #[arg(long, action = ArgAction::SetTrue)]
        exit_on_stop: bool,
        /// Read start/stop and diagnostic keys from stdin (s, p, r)
        #[arg(long, action = ArgAction::SetTrue)]
        console: bool,
        /// Enable real-time mode (SCHED_FIFO, affinity, mlockall)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable real-time mode on Linux.\n\nAttempts SCHED_FIFO priority, pins to one CPU, and locks the address space into RAM. This reduces scheduling jitter on the control ticks but may require elevated privileges or ulimits (e.g., memlock)."
        )]
        rt: bool,
        /// SCHED_FIFO priority when --rt is set (clamped to the system range)
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
        /// Memory locking mode for --rt
        #[arg(long, value_enum, value_name = "MODE", default_value = "current")]
        rt_lock: RtLock,
        /// CPU index to pin to when --rt is set
        #[arg(long, value_name = "CPU")]
        rt_cpu: Option<usize>,
    },
    /// Capture one frame and print the hot column and its yaw angle
    Peek {
        /// Simulated target column (sim back end only)
        #[arg(long, value_name = "N")]
        sim_column: Option<usize>,
    },
    /// Build every device and report whether the rig is usable
    SelfCheck,
}
