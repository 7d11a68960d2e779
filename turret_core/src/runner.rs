//! The outer loop: start/stop edges, shutdown, idle diagnostics and
//! scheduler passes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use turret_traits::{EncoderCounter, FrameSource, Launcher, PwmOutput};

use crate::error::Result;
use crate::scheduler::Scheduler;
use crate::signal::StartStopSignal;
use crate::status::{Mode, Pass, RunStats};
use crate::targeting::Target;

/// Console diagnostics served while idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagCommand {
    /// Capture a frame and report the hot column and its angle.
    Peek,
    /// Report both axis positions.
    Positions,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiagReport {
    Target(Target),
    /// Peek capture timed out.
    NoFrame,
    Positions { yaw: f64, pitch: f64 },
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Leave the loop on a stop edge instead of returning to idle.
    pub exit_on_stop: bool,
    /// Sleep between idle passes.
    pub idle_poll: Duration,
    /// Hard cap on total run time.
    pub max_run: Option<Duration>,
    /// Behave as if a start edge arrived before the first pass.
    pub start: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            exit_on_stop: false,
            idle_poll: Duration::from_millis(20),
            max_run: None,
            start: false,
        }
    }
}

/// Inputs from other threads.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    pub signal: StartStopSignal,
    pub shutdown: Arc<AtomicBool>,
    pub commands: Option<Receiver<DiagCommand>>,
    pub reports: Option<Sender<DiagReport>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Shutdown,
    Stopped,
    MaxRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub reason: ExitReason,
    pub stats: RunStats,
}

/// Drive the scheduler until shutdown, `max_run`, or (with `exit_on_stop`)
/// a stop edge.
///
/// Motors are neutral and the launcher disarmed on every exit path. A
/// device fault aborts the run and is returned after the safe stop.
pub fn run<E, P, F, L>(
    turret: &mut Scheduler<E, P, F, L>,
    ctl: &RunControl,
    opts: &RunOptions,
) -> Result<RunOutcome>
where
    E: EncoderCounter,
    P: PwmOutput,
    F: FrameSource,
    L: Launcher,
{
    if opts.start {
        ctl.signal.raise();
    }
    let started = turret.clock.now();
    tracing::info!(
        exit_on_stop = opts.exit_on_stop,
        max_run_ms = opts.max_run.map(|d| d.as_millis() as u64),
        "runner start"
    );

    let reason = match run_loop(turret, ctl, opts, started) {
        Ok(reason) => reason,
        Err(e) => {
            if let Err(stop_err) = turret.safe_stop() {
                tracing::error!(error = %stop_err, "safe stop failed");
            }
            tracing::error!(error = %e, "run aborted");
            return Err(e);
        }
    };

    turret.safe_stop()?;
    let stats = *turret.stats();
    tracing::info!(
        ?reason,
        shots = stats.shots,
        retargets = stats.retargets,
        control_ticks = stats.control_ticks,
        "runner exit"
    );
    Ok(RunOutcome { reason, stats })
}

fn run_loop<E, P, F, L>(
    turret: &mut Scheduler<E, P, F, L>,
    ctl: &RunControl,
    opts: &RunOptions,
    started: std::time::Instant,
) -> Result<ExitReason>
where
    E: EncoderCounter,
    P: PwmOutput,
    F: FrameSource,
    L: Launcher,
{
    loop {
        if ctl.shutdown.load(Ordering::Acquire) {
            return Ok(ExitReason::Shutdown);
        }
        if let Some(max) = opts.max_run {
            if turret.clock.now().saturating_duration_since(started) >= max {
                return Ok(ExitReason::MaxRun);
            }
        }

        let pass_start = turret.clock.now();
        if ctl.signal.take() {
            if turret.toggle()? == Pass::Stopped && opts.exit_on_stop {
                return Ok(ExitReason::Stopped);
            }
            turret.record_pass(turret.clock.now().saturating_duration_since(pass_start));
            continue;
        }

        match turret.mode() {
            Mode::Idle => {
                serve_diagnostics(turret, ctl)?;
                turret.clock.sleep(opts.idle_poll);
            }
            Mode::Tracking => {
                drain_commands(ctl);
                match turret.step()? {
                    Pass::Waiting => {
                        let wait = turret.time_to_next_deadline();
                        turret.clock.sleep(wait.max(Duration::from_micros(100)));
                    }
                    _ => {
                        turret.record_pass(turret.clock.now().saturating_duration_since(pass_start));
                    }
                }
            }
        }
    }
}

fn serve_diagnostics<E, P, F, L>(
    turret: &mut Scheduler<E, P, F, L>,
    ctl: &RunControl,
) -> Result<()>
where
    E: EncoderCounter,
    P: PwmOutput,
    F: FrameSource,
    L: Launcher,
{
    let Some(rx) = ctl.commands.as_ref() else {
        return Ok(());
    };
    while let Ok(cmd) = rx.try_recv() {
        let report = match cmd {
            DiagCommand::Peek => match turret.peek()? {
                Some(t) => {
                    tracing::info!(column = t.column, angle = t.angle, "peek");
                    DiagReport::Target(t)
                }
                None => DiagReport::NoFrame,
            },
            DiagCommand::Positions => {
                let (yaw, pitch) = turret.positions()?;
                tracing::info!(yaw, pitch, "positions");
                DiagReport::Positions { yaw, pitch }
            }
        };
        if let Some(tx) = ctl.reports.as_ref() {
            // A closed report channel only means nobody is listening.
            let _ = tx.send(report);
        }
    }
    Ok(())
}

fn drain_commands(ctl: &RunControl) {
    if let Some(rx) = ctl.commands.as_ref() {
        while let Ok(cmd) = rx.try_recv() {
            tracing::debug!(?cmd, "diagnostics are only served while idle");
        }
    }
}
