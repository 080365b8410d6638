//! The foreground polling loop.
//!
//! Every iteration: honour the shutdown flag and the optional run duration,
//! apply at most one host command per `serial_poll`, then either `tick()` the
//! turret (when running) or idle for `idle_poll` on the turret clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};

use crate::encoder::EncoderState;
use crate::error::Result;
use crate::protocol::Command;
use crate::status::TurretMode;
use crate::turret::Turret;
use crate::util::period_us;

#[derive(Debug, Clone)]
pub struct RunParams {
    /// Minimum spacing between two applied commands.
    pub serial_poll: Duration,
    /// Sleep per iteration while not running.
    pub idle_poll: Duration,
    /// Stop after this long; `None` runs until shutdown.
    pub max_duration: Option<Duration>,
    /// Pace ticks at this rate instead of polling flat out.
    pub sample_rate_hz: Option<u32>,
    /// Issue `Start` before the first iteration.
    pub autostart: bool,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            serial_poll: Duration::from_millis(100),
            idle_poll: Duration::from_millis(10),
            max_duration: None,
            sample_rate_hz: None,
            autostart: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    Duration,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub reason: StopReason,
    pub elapsed: Duration,
    pub ticks: u64,
    pub commands_applied: u64,
    pub commands_failed: u64,
    pub final_mode: TurretMode,
    pub encoder: EncoderState,
}

/// Run the loop until shutdown or `max_duration`. The motor is stopped on exit;
/// `final_mode` is the mode just before that.
///
/// Command failures (a calibration that gave up) are logged and counted; an
/// encoder read failure while running stops the motor and ends the loop with
/// the error.
pub fn run(
    turret: &mut Turret,
    commands: &Receiver<Command>,
    shutdown: &AtomicBool,
    params: &RunParams,
) -> Result<RunSummary> {
    let clock = turret.clock().clone();
    let started = clock.now();
    let mut last_poll: Option<Instant> = None;
    let mut channel_open = true;
    let mut ticks = 0u64;
    let mut applied = 0u64;
    let mut failed = 0u64;
    let pace = params
        .sample_rate_hz
        .map(|hz| Duration::from_micros(period_us(hz)));

    tracing::info!(
        serial_poll_ms = params.serial_poll.as_millis() as u64,
        max_duration_ms = params.max_duration.map(|d| d.as_millis() as u64),
        sample_rate_hz = params.sample_rate_hz,
        "runner started"
    );

    if params.autostart {
        apply_one(turret, Command::Start, &mut applied, &mut failed);
    }

    let outcome: Result<StopReason> = loop {
        if shutdown.load(Ordering::Relaxed) {
            break Ok(StopReason::Shutdown);
        }
        let now = clock.now();
        if let Some(max) = params.max_duration {
            if now.saturating_duration_since(started) >= max {
                break Ok(StopReason::Duration);
            }
        }

        let due = last_poll.is_none_or(|t| now.saturating_duration_since(t) >= params.serial_poll);
        if channel_open && due {
            last_poll = Some(now);
            match commands.try_recv() {
                Ok(cmd) => apply_one(turret, cmd, &mut applied, &mut failed),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    tracing::debug!("command source closed");
                    channel_open = false;
                }
            }
        }

        if turret.mode() == TurretMode::Running {
            match turret.tick() {
                Ok(Some(_)) => ticks += 1,
                Ok(None) => {}
                Err(e) => break Err(e),
            }
            if let Some(p) = pace {
                clock.sleep(p);
            }
        } else {
            clock.sleep(params.idle_poll);
        }
    };

    let final_mode = turret.mode();
    turret.stop();
    let reason = match outcome {
        Ok(reason) => reason,
        Err(e) => {
            tracing::error!(error = %e, ticks, "runner aborted; motor stopped");
            return Err(e);
        }
    };
    let summary = RunSummary {
        reason,
        elapsed: clock.now().saturating_duration_since(started),
        ticks,
        commands_applied: applied,
        commands_failed: failed,
        final_mode,
        encoder: *turret.encoder(),
    };
    tracing::info!(
        reason = ?summary.reason,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        ticks,
        commands_applied = applied,
        commands_failed = failed,
        "runner stopped"
    );
    Ok(summary)
}

fn apply_one(turret: &mut Turret, cmd: Command, applied: &mut u64, failed: &mut u64) {
    match turret.apply(cmd) {
        Ok(()) => *applied += 1,
        Err(e) => {
            *failed += 1;
            tracing::error!(?cmd, error = %e, "command failed");
        }
    }
}
