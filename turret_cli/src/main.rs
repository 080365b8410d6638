mod cli;
mod devices;
mod error_fmt;
mod input;
mod rt;
mod telemetry;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::Parser;
use eyre::WrapErr;
use serde_json::json;
use turret_config::{Config, Logging};
use turret_core::hw_error::map_hw_error;
use turret_core::mocks::NullTelemetry;
use turret_core::runner::{self, RunParams, RunSummary, StopReason};
use turret_traits::{EncoderSensor, RangeFinder};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE, RtLock, json_mode};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::telemetry::StdoutTelemetry;

struct RunOpts {
    commands: Option<PathBuf>,
    max_run_ms: Option<u64>,
    autostart: bool,
    rt: bool,
    rt_prio: Option<i32>,
    rt_lock: Option<RtLock>,
    rt_cpu: Option<usize>,
}

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("Warning: color-eyre not installed: {e}");
    }

    if let Err(err) = real_main(cli) {
        tracing::error!(error = %err, "turret failed");
        if json_mode() {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli.config)?;
    init_tracing(&cli, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::SelfCheck => self_check(&cfg),
        Commands::Calibrate => calibrate(&cfg),
        Commands::Run {
            commands,
            max_run_ms,
            autostart,
            rt,
            rt_prio,
            rt_lock,
            rt_cpu,
        } => run(
            &cfg,
            RunOpts {
                commands,
                max_run_ms,
                autostart,
                rt,
                rt_prio,
                rt_lock,
                rt_cpu,
            },
        ),
    }
}

fn load_config(path: &Path) -> eyre::Result<Config> {
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = turret_config::load_toml(&text).wrap_err("invalid configuration")?;
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

/// Console logs go to stderr (stdout carries telemetry); `[logging] file`
/// adds a JSON file sink with its own level and rotation.
fn init_tracing(cli: &Cli, logging: &Logging) -> eyre::Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let console_filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(&cli.log_level).wrap_err("invalid --log-level")?,
    };
    let console = if cli.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter)
            .boxed()
    };

    let file = match logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name"))?;
            let rotation = match logging.rotation.as_deref() {
                Some("daily") => Rotation::DAILY,
                Some("hourly") => Rotation::HOURLY,
                _ => Rotation::NEVER,
            };
            let (writer, guard) =
                tracing_appender::non_blocking(RollingFileAppender::new(rotation, dir, name));
            let _ = FILE_GUARD.set(guard);
            let level = EnvFilter::try_new(logging.level.as_deref().unwrap_or("info"))
                .wrap_err("invalid logging.level")?;
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(level)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .wrap_err("init tracing")?;
    Ok(())
}

fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn self_check(cfg: &Config) -> eyre::Result<()> {
    let mut dev = devices::open(cfg)?;
    let reading = dev.encoder.read().map_err(|e| map_hw_error(&*e))?;
    let distance = match dev.range_finder.as_mut() {
        Some(rf) => Some(rf.distance().map_err(|e| map_hw_error(&*e))?),
        None => None,
    };
    if json_mode() {
        println!(
            "{}",
            json!({
                "timestamp": unix_ms(),
                "status": "ok",
                "backend": dev.backend,
                "encoder": reading,
                "distance_cm": distance,
            })
        );
    } else {
        let distance = distance.map_or_else(|| "disabled".to_string(), |d| d.to_string());
        println!(
            "OK backend={} encoder={reading} distance_cm={distance}",
            dev.backend
        );
    }
    Ok(())
}

fn calibrate(cfg: &Config) -> eyre::Result<()> {
    let mut turret = devices::open(cfg)?.into_turret(cfg, NullTelemetry)?;
    let clock = turret.clock().clone();
    let started = clock.now();
    let result = turret.start().wrap_err("calibrate")?;
    let elapsed = clock.now().saturating_duration_since(started);
    turret.stop();

    let slowest_us = result.slowest_period.as_micros() as u64;
    if json_mode() {
        println!(
            "{}",
            json!({
                "timestamp": unix_ms(),
                "home_tick": result.home_tick,
                "completed": result.completed,
                "slowest_period_us": slowest_us,
                "duration_ms": elapsed.as_millis() as u64,
            })
        );
    } else {
        println!(
            "calibrated: home_tick={} slowest_period_us={slowest_us} duration_ms={}",
            result.home_tick,
            elapsed.as_millis()
        );
    }
    Ok(())
}

fn run(cfg: &Config, opts: RunOpts) -> eyre::Result<()> {
    #[cfg(target_os = "linux")]
    rt::setup_rt_once(
        opts.rt,
        opts.rt_prio,
        opts.rt_lock.unwrap_or(RtLock::os_default()),
        opts.rt_cpu,
    );
    #[cfg(target_os = "macos")]
    {
        let _ = (opts.rt_prio, opts.rt_cpu);
        rt::setup_rt_once(opts.rt, opts.rt_lock.unwrap_or(RtLock::os_default()));
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    if opts.rt {
        tracing::warn!("--rt is not supported on this OS");
    }

    let telemetry = StdoutTelemetry::new(json_mode());
    let mut turret = devices::open(cfg)?.into_turret(cfg, telemetry)?;
    telemetry.announce().wrap_err("write identification line")?;

    let (tx, rx) = crossbeam_channel::unbounded();
    match &opts.commands {
        Some(path) => {
            let file = fs::File::open(path)
                .wrap_err_with(|| format!("open commands file {}", path.display()))?;
            let queued = input::pump(file, &tx);
            tracing::info!(queued, file = %path.display(), "commands queued");
            drop(tx);
        }
        None => {
            input::spawn_stdin_reader(tx).wrap_err("spawn stdin reader")?;
        }
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
            .wrap_err("install Ctrl-C handler")?;
    }

    let mut params = RunParams::from(&cfg.runner);
    params.max_duration = opts.max_run_ms.map(Duration::from_millis);
    params.autostart |= opts.autostart;

    let summary = runner::run(&mut turret, &rx, &shutdown, &params)?;
    report_summary(&summary);
    Ok(())
}

fn stop_reason_name(r: StopReason) -> &'static str {
    match r {
        StopReason::Shutdown => "shutdown",
        StopReason::Duration => "duration",
    }
}

/// JSON mode: one summary line on stdout. Text mode: stderr, since stdout is
/// the protocol stream.
fn report_summary(s: &RunSummary) {
    if json_mode() {
        println!(
            "{}",
            json!({
                "type": "summary",
                "timestamp": unix_ms(),
                "reason": stop_reason_name(s.reason),
                "duration_ms": s.elapsed.as_millis() as u64,
                "ticks": s.ticks,
                "commands_applied": s.commands_applied,
                "commands_failed": s.commands_failed,
                "mode": s.final_mode.as_str(),
                "tick": s.encoder.tick_count,
                "rotation": s.encoder.rotation_count,
            })
        );
    } else {
        eprintln!(
            "stopped ({}) after {} ms: {} ticks, {} commands applied, {} failed, mode {}, position {}/{}",
            stop_reason_name(s.reason),
            s.elapsed.as_millis(),
            s.ticks,
            s.commands_applied,
            s.commands_failed,
            s.final_mode,
            s.encoder.rotation_count,
            s.encoder.tick_count,
        );
    }
}
