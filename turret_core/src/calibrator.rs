//! Startup homing sequence.
//!
//! The disk has one slot wider than the rest. Spinning at a steady speed, the
//! tick that ends on that slot takes noticeably longer than any other, which
//! gives a repeatable reference no matter where the disk was at power-on:
//!
//! 1. `SpinUp`: command `SPIN_UP_SPEED` and let the motor settle.
//! 2. `FindFirstTick`: wait for any tick, then zero the counts.
//! 3. `FindSlowestTick`: for one full rotation remember the tick with the
//!    longest period.
//! 4. `SeekSlowestTick`: servo to that tick and re-zero there.
//! 5. `SeekHome`: servo `HOME_OFFSET_TICK` further and re-zero again.
//! 6. `Done`: stop, hold, then hand over at `DEFAULT_SPEED`.
//!
//! [`Calibrator::poll`] performs one unit of work per call so the sequence can
//! be interleaved with other duties; [`Calibrator::run`] drives it to the end.

use std::time::{Duration, Instant};

use crate::axis::ServoAxis;
use crate::config::{
    CalibrationCfg, DEFAULT_SPEED, DONE_SETTLE, HOME_OFFSET_TICK, SPIN_UP_SETTLE, SPIN_UP_SPEED,
};
use crate::controller::PositionController;
use crate::error::{Result, TurretError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    SpinUp,
    FindFirstTick,
    FindSlowestTick,
    SeekSlowestTick,
    SeekHome,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationResult {
    /// Tick index, counted from the first observed tick, of the slowest tick.
    pub home_tick: u16,
    pub completed: bool,
    /// Period of the slowest tick.
    pub slowest_period: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStatus {
    /// Work was done; poll again.
    InProgress,
    /// Nothing to do for this long; polling earlier just reports the remainder.
    Waiting(Duration),
    Done(CalibrationResult),
}

#[derive(Debug, Clone)]
pub struct Calibrator {
    cfg: CalibrationCfg,
    phase: CalibrationPhase,
    started_at: Option<Instant>,
    hold_until: Option<Instant>,
    slowest_tick: u16,
    slowest_period: Duration,
    result: Option<CalibrationResult>,
}

impl Calibrator {
    pub fn new(cfg: CalibrationCfg) -> Self {
        Self {
            cfg,
            phase: CalibrationPhase::SpinUp,
            started_at: None,
            hold_until: None,
            slowest_tick: 0,
            slowest_period: Duration::ZERO,
            result: None,
        }
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    /// Slowest tick seen so far in `FindSlowestTick`.
    pub fn slowest_tick(&self) -> u16 {
        self.slowest_tick
    }

    pub fn result(&self) -> Option<CalibrationResult> {
        self.result
    }

    fn enter(&mut self, phase: CalibrationPhase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "calibration phase");
        self.phase = phase;
    }

    /// Time-boxed hold. Returns `None` once the hold has elapsed.
    fn hold<A: ServoAxis + ?Sized>(&mut self, axis: &A, d: Duration) -> Option<Duration> {
        let now = axis.now();
        match self.hold_until {
            None => {
                self.hold_until = Some(now + d);
                Some(d)
            }
            Some(until) if now < until => Some(until - now),
            Some(_) => {
                self.hold_until = None;
                None
            }
        }
    }

    fn check_timeout<A: ServoAxis + ?Sized>(&self, axis: &mut A) -> Result<()> {
        let (Some(limit), Some(started)) = (self.cfg.timeout, self.started_at) else {
            return Ok(());
        };
        if self.phase == CalibrationPhase::Done {
            return Ok(());
        }
        let elapsed = axis.now().saturating_duration_since(started);
        if elapsed >= limit {
            axis.stop();
            let elapsed_ms = elapsed.as_millis() as u64;
            tracing::warn!(phase = ?self.phase, elapsed_ms, "calibration timed out");
            return Err(eyre::Report::new(TurretError::CalibrationTimedOut {
                phase: self.phase,
                elapsed_ms,
            }));
        }
        Ok(())
    }

    /// Advance the sequence by one unit of work.
    ///
    /// Sampling phases read the encoder once per call. Encoder errors and the
    /// optional timeout are returned; the motor is stopped on timeout.
    pub fn poll<A: ServoAxis + ?Sized>(
        &mut self,
        axis: &mut A,
        controller: &mut PositionController,
    ) -> Result<CalibrationStatus> {
        if let Some(done) = self.result {
            return Ok(CalibrationStatus::Done(done));
        }
        if self.started_at.is_none() {
            self.started_at = Some(axis.now());
            tracing::info!(timeout = ?self.cfg.timeout, "calibration started");
        }
        self.check_timeout(axis)?;

        match self.phase {
            CalibrationPhase::SpinUp => {
                if self.hold_until.is_none() {
                    axis.set_speed(SPIN_UP_SPEED);
                }
                if let Some(left) = self.hold(axis, SPIN_UP_SETTLE) {
                    return Ok(CalibrationStatus::Waiting(left));
                }
                self.enter(CalibrationPhase::FindFirstTick);
            }
            CalibrationPhase::FindFirstTick => {
                if axis.sample()?.is_some() {
                    axis.reset_counts();
                    self.slowest_tick = 0;
                    self.slowest_period = Duration::ZERO;
                    self.enter(CalibrationPhase::FindSlowestTick);
                }
            }
            CalibrationPhase::FindSlowestTick => {
                if let Some(ev) = axis.sample()? {
                    if ev.period > self.slowest_period {
                        self.slowest_period = ev.period;
                        self.slowest_tick = ev.tick;
                    }
                }
                if axis.encoder().rotation_count != 0 {
                    tracing::debug!(
                        slowest_tick = self.slowest_tick,
                        period_us = self.slowest_period.as_micros() as u64,
                        "slowest tick found"
                    );
                    self.enter(CalibrationPhase::SeekSlowestTick);
                }
            }
            CalibrationPhase::SeekSlowestTick => {
                if controller.step(axis, self.slowest_tick)? {
                    axis.rezero();
                    self.enter(CalibrationPhase::SeekHome);
                }
            }
            CalibrationPhase::SeekHome => {
                if controller.step(axis, HOME_OFFSET_TICK)? {
                    axis.rezero();
                    self.enter(CalibrationPhase::Done);
                }
            }
            CalibrationPhase::Done => {
                if self.hold_until.is_none() {
                    axis.stop();
                }
                if let Some(left) = self.hold(axis, DONE_SETTLE) {
                    return Ok(CalibrationStatus::Waiting(left));
                }
                axis.set_speed(DEFAULT_SPEED);
                let result = CalibrationResult {
                    home_tick: self.slowest_tick,
                    completed: true,
                    slowest_period: self.slowest_period,
                };
                tracing::info!(
                    home_tick = result.home_tick,
                    slowest_period_us = result.slowest_period.as_micros() as u64,
                    "calibration complete"
                );
                self.result = Some(result);
                return Ok(CalibrationStatus::Done(result));
            }
        }
        Ok(CalibrationStatus::InProgress)
    }

    /// Drive [`poll`](Self::poll) to completion, sleeping through holds on the
    /// axis clock. Without a timeout this never returns if the encoder is dead.
    pub fn run<A: ServoAxis + ?Sized>(
        &mut self,
        axis: &mut A,
        controller: &mut PositionController,
    ) -> Result<CalibrationResult> {
        loop {
            match self.poll(axis, controller)? {
                CalibrationStatus::InProgress => {}
                CalibrationStatus::Waiting(d) => axis.sleep(d),
                CalibrationStatus::Done(r) => return Ok(r),
            }
        }
    }
}
