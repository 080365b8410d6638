//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls telemetry and error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[inline]
pub fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

#[derive(Parser, Debug)]
#[command(name = "turret", version, about = "Spinning lidar turret controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/turret_config.toml")]
    pub config: PathBuf,

    /// Emit telemetry, summaries and errors as JSON lines
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

impl RtLock {
    #[inline]
    pub fn os_default() -> Self {
        #[cfg(target_os = "linux")]
        {
            return RtLock::Current;
        }
        #[cfg(target_os = "macos")]
        {
            return RtLock::None;
        }
        #[allow(unreachable_code)]
        RtLock::None
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop; host commands come from stdin or --commands
    Run {
        /// Read protocol lines from this file instead of stdin
        #[arg(long, value_name = "FILE")]
        commands: Option<PathBuf>,
        /// Stop after this many ms of turret time
        #[arg(long, value_name = "MS")]
        max_run_ms: Option<u64>,
        /// Calibrate and start immediately (overrides runner.autostart)
        #[arg(long, action = ArgAction::SetTrue)]
        autostart: bool,
        /// Enable real-time mode (SCHED_FIFO, affinity, mlockall)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable real-time mode on supported OSes.\n\nLinux: SCHED_FIFO priority, pinning to one CPU and mlockall. The tick loop samples the encoder without sleeping, so pin it to a core that has nothing else to do. May require elevated privileges or a raised memlock ulimit.\n\nmacOS: only mlockall is applied."
        )]
        rt: bool,
        /// Real-time priority for SCHED_FIFO on Linux (1..=max); ignored on macOS
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
        /// Select memory locking mode for --rt: none, current, or all
        #[arg(
            long,
            value_enum,
            value_name = "MODE",
            long_help = "Select memory locking mode when --rt is enabled.\n- none: do not lock memory.\n- current: mlockall(MCL_CURRENT).\n- all: mlockall(MCL_CURRENT|MCL_FUTURE).\nDefault: current on Linux, none on macOS."
        )]
        rt_lock: Option<RtLock>,
        /// CPU index to pin the process to (Linux only, default 0)
        #[arg(long, value_name = "CPU")]
        rt_cpu: Option<usize>,
    },
    /// Run the homing sequence once and report the result
    Calibrate,
    /// Quick health check (one encoder and one distance reading)
    SelfCheck,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "turret",
            "--json",
            "run",
            "--max-run-ms",
            "250",
            "--autostart",
            "--rt-lock",
            "all",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.cmd {
            Commands::Run {
                max_run_ms,
                autostart,
                rt_lock,
                ..
            } => {
                assert_eq!(max_run_ms, Some(250));
                assert!(autostart);
                assert_eq!(rt_lock, Some(RtLock::All));
            }
            other => panic!("unexpected subcommand {other:?}"),
        }
    }
}
