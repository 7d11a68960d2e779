//! Subcommand bodies: run, peek and self-check, plus the console threads.

use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use eyre::{Result, WrapErr};
use serde_json::json;
use turret_config::Config;
use turret_core::{
    DiagCommand, DiagReport, ExitReason, RunControl, RunOptions, RunOutcome, StartStopSignal,
    Target, TurretError, TurretSettings,
};

use crate::devices;

#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub sim_column: Option<usize>,
    pub max_run_ms: Option<u64>,
    pub start: bool,
    pub exit_on_stop: bool,
    pub console: bool,
}

pub fn exit_reason_name(r: ExitReason) -> &'static str {
    match r {
        ExitReason::Shutdown => "Shutdown",
        ExitReason::Stopped => "Stopped",
        ExitReason::MaxRun => "MaxRun",
    }
}

fn run_options(cfg: &Config, args: &RunArgs) -> RunOptions {
    let max_run_ms = args.max_run_ms.unwrap_or(cfg.runner.max_run_ms);
    RunOptions {
        exit_on_stop: args.exit_on_stop || cfg.runner.exit_on_stop,
        idle_poll: Duration::from_millis(cfg.runner.idle_poll_ms),
        max_run: (max_run_ms > 0).then(|| Duration::from_millis(max_run_ms)),
        start: args.start,
    }
}

/// Assemble the rig and drive it until shutdown, stop or `max_run`.
pub fn run_turret(
    cfg: &Config,
    settings: TurretSettings,
    args: &RunArgs,
    shutdown: Arc<AtomicBool>,
    json: bool,
) -> Result<RunOutcome> {
    let signal = StartStopSignal::new();
    let mut rig = devices::assemble(cfg, settings, args.sim_column, &signal)?;

    let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
    let (report_tx, report_rx) = crossbeam_channel::unbounded();
    if args.console {
        spawn_key_reader(signal.clone(), cmd_tx);
        if !json {
            eprintln!("keys: s = start/stop, p = peek (idle), r = positions (idle)");
        }
    } else {
        drop(cmd_tx);
    }
    let printer = spawn_report_printer(report_rx, json);

    let ctl = RunControl {
        signal,
        shutdown,
        commands: Some(cmd_rx),
        reports: Some(report_tx),
    };
    let opts = run_options(cfg, args);
    tracing::info!(backend = rig.backend, start = opts.start, "run");
    let outcome = turret_core::runner::run(&mut rig.turret, &ctl, &opts);

    // Closing the report channel ends the printer.
    drop(ctl);
    if printer.join().is_err() {
        tracing::warn!("report printer panicked");
    }
    outcome
}

/// One capture, no arming and no motion.
pub fn peek(cfg: &Config, settings: TurretSettings, sim_column: Option<usize>) -> Result<Target> {
    let signal = StartStopSignal::new();
    let mut rig = devices::assemble(cfg, settings, sim_column, &signal)?;
    rig.turret
        .peek()?
        .ok_or_else(|| eyre::Report::new(TurretError::Timeout))
        .wrap_err("peek capture")
}

/// Build every device and read both encoders once.
pub fn self_check(cfg: &Config, settings: TurretSettings) -> Result<&'static str> {
    let signal = StartStopSignal::new();
    let mut rig = devices::assemble(cfg, settings, None, &signal)?;
    let (yaw, pitch) = rig.turret.positions()?;
    tracing::info!(backend = rig.backend, yaw, pitch, "self-check ok");
    Ok(rig.backend)
}

pub fn print_target(t: &Target, json: bool) {
    if json {
        println!("{}", json!({ "column": t.column, "angle": t.angle }));
    } else {
        println!("hot column {} -> yaw {:.3} rad", t.column, t.angle);
    }
}

pub fn print_summary(o: &RunOutcome, json: bool) {
    let s = &o.stats;
    if json {
        let obj = json!({
            "reason": exit_reason_name(o.reason),
            "starts": s.starts,
            "stops": s.stops,
            "retargets": s.retargets,
            "capture_timeouts": s.capture_timeouts,
            "shots": s.shots,
            "misfires": s.misfires,
            "disarms": s.disarms,
            "control_ticks": s.control_ticks,
            "deadline_overruns": s.deadline_overruns,
            "max_pass_us": s.max_pass_us,
        });
        println!("{obj}");
    } else {
        println!("Run finished ({}).", exit_reason_name(o.reason));
        println!("Shots fired: {} (misfires: {})", s.shots, s.misfires);
        println!(
            "Retargets: {} (capture timeouts: {})",
            s.retargets, s.capture_timeouts
        );
        println!(
            "Control ticks: {} (overruns: {})",
            s.control_ticks, s.deadline_overruns
        );
        println!("Longest pass: {} us", s.max_pass_us);
    }
}

/// Line-buffered stdin: `s` toggles tracking, `p`/`r` request diagnostics.
fn spawn_key_reader(signal: StartStopSignal, commands: Sender<DiagCommand>) {
    let spawned = thread::Builder::new()
        .name("console-keys".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                for key in line.chars() {
                    let sent = match key {
                        's' | 'S' => {
                            signal.raise();
                            Ok(())
                        }
                        'p' | 'P' => commands.send(DiagCommand::Peek),
                        'r' | 'R' => commands.send(DiagCommand::Positions),
                        _ => Ok(()),
                    };
                    if sent.is_err() {
                        return;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "console key reader unavailable");
    }
}

fn spawn_report_printer(reports: Receiver<DiagReport>, json: bool) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for report in reports.iter() {
            match report {
                DiagReport::Target(t) => print_target(&t, json),
                DiagReport::NoFrame if json => println!("{}", json!({ "peek": "timeout" })),
                DiagReport::NoFrame => println!("peek: camera timed out"),
                DiagReport::Positions { yaw, pitch } if json => {
                    println!("{}", json!({ "yaw": yaw, "pitch": pitch }));
                }
                DiagReport::Positions { yaw, pitch } => {
                    println!("yaw {yaw:.3} rad, pitch {pitch:.3} rad");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_max_run_overrides_config() {
        let mut cfg = Config::default();
        cfg.runner.max_run_ms = 5_000;
        let args = RunArgs {
            max_run_ms: Some(250),
            ..RunArgs::default()
        };
        assert_eq!(
            run_options(&cfg, &args).max_run,
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn zero_max_run_means_unbounded() {
        let cfg = Config::default();
        assert_eq!(run_options(&cfg, &RunArgs::default()).max_run, None);
    }

    #[test]
    fn exit_on_stop_from_either_source() {
        let mut cfg = Config::default();
        cfg.runner.exit_on_stop = true;
        assert!(run_options(&cfg, &RunArgs::default()).exit_on_stop);
        let args = RunArgs {
            exit_on_stop: true,
            ..RunArgs::default()
        };
        assert!(run_options(&Config::default(), &args).exit_on_stop);
    }
}
