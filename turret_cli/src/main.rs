#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `turret` binary: config loading, logging setup and subcommand dispatch.

mod cli;
mod devices;
mod error_fmt;
mod rt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Result, WrapErr};
use turret_core::{TargetingCfg, TurretError, TurretSettings};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("warning: error hooks not installed: {e}");
    }

    if let Err(err) = real_main(cli) {
        tracing::error!(error = %err, "turret failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn config_error(msg: String) -> eyre::Report {
    eyre::Report::new(TurretError::Config(msg))
}

fn load_config(path: &Path) -> Result<turret_config::Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| config_error(format!("read {}: {e}", path.display())))?;
    let cfg: turret_config::Config = toml::from_str(&text)
        .map_err(|e| config_error(format!("parse {}: {e}", path.display())))?;
    cfg.validate().map_err(|e| config_error(e.to_string()))?;
    Ok(cfg)
}

fn init_tracing(json: bool, level: &str, logging: &turret_config::Logging) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| config_error(format!("invalid --log-level '{level}': {e}")))?;
    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    };

    let file = match logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| config_error(format!("logging.file {path:?} has no file name")))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            let file_level = logging.level.as_deref().unwrap_or("info");
            let file_filter = EnvFilter::try_new(file_level)
                .map_err(|e| config_error(format!("invalid logging.level '{file_level}': {e}")))?;
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(file_filter)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| eyre::eyre!("init tracing: {e}"))
}

fn real_main(cli: Cli) -> Result<()> {
    let cfg = load_config(&cli.config).wrap_err("load config")?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging)?;

    let mut settings = TurretSettings::from(&cfg);
    if let Some(path) = cli.calibration.as_deref() {
        let calib = turret_config::load_calibration_csv(path)
            .map_err(|e| config_error(e.to_string()))?;
        tracing::info!(
            slope = calib.slope,
            intercept = calib.intercept,
            "targeting calibration loaded"
        );
        settings.targeting = TargetingCfg::from(&calib);
    }

    match cli.cmd {
        Commands::Run {
            sim_column,
            max_run_ms,
            start,
            exit_on_stop,
            console,
            rt,
            rt_prio,
            rt_lock,
            rt_cpu,
        } => {
            if rt {
                rt::setup_rt_once(rt_prio, rt_lock, rt_cpu);
            }
            let shutdown = Arc::new(AtomicBool::new(false));
            {
                let flag = shutdown.clone();
                if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Release)) {
                    tracing::warn!(error = %e, "Ctrl-C handler not installed");
                }
            }
            let args = run::RunArgs {
                sim_column,
                max_run_ms,
                start,
                exit_on_stop,
                console,
            };
            let outcome = run::run_turret(&cfg, settings, &args, shutdown, cli.json)?;
            run::print_summary(&outcome, cli.json);
        }
        Commands::Peek { sim_column } => {
            let target = run::peek(&cfg, settings, sim_column)?;
            run::print_target(&target, cli.json);
        }
        Commands::SelfCheck => {
            let backend = run::self_check(&cfg, settings)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({ "status": "ok", "backend": backend })
                );
            } else {
                println!("OK ({backend})");
            }
        }
    }
    Ok(())
}
