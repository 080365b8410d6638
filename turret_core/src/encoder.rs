//! Encoder tick tracking with a two-threshold hysteresis latch.
//!
//! The disk alternates open and blocked regions in front of the optical sensor.
//! A reading above `HIGH_THRESHOLD` arms the latch; the next reading below
//! `LOW_THRESHOLD` while armed fires exactly one tick and disarms it. Readings in
//! between the thresholds are ignored, so noise around a single level cannot
//! double count.

use std::time::{Duration, Instant};

use crate::actuator::Direction;
use crate::config::{HIGH_THRESHOLD, LOW_THRESHOLD, TICKS_PER_ROTATION};

/// Position and timing state of the encoder.
///
/// `tick_count` is always in `[0, TICKS_PER_ROTATION)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderState {
    pub tick_count: u16,
    pub rotation_count: i32,
    /// Latch: the sensor has been seen above the high threshold since the last tick.
    pub armed: bool,
    pub last_tick_at: Instant,
    /// Time between the two most recent ticks.
    pub last_tick_period: Duration,
}

/// A detected slot edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickEvent {
    /// Tick index after this tick was counted.
    pub tick: u16,
    pub rotation: i32,
    pub period: Duration,
    pub at: Instant,
}

#[derive(Debug, Clone)]
pub struct EncoderTracker {
    state: EncoderState,
}

impl EncoderTracker {
    /// Start at tick 0, rotation 0, latch disarmed; `now` seeds the period timer.
    pub fn new(now: Instant) -> Self {
        Self {
            state: EncoderState {
                tick_count: 0,
                rotation_count: 0,
                // Unlike the firmware, not seeded from a power-up reading: a disk
                // parked low gives no tick until it has passed above HIGH_THRESHOLD.
                armed: false,
                last_tick_at: now,
                last_tick_period: Duration::ZERO,
            },
        }
    }

    pub fn state(&self) -> &EncoderState {
        &self.state
    }

    /// Classify a raw reading and sample it.
    pub fn sample_raw(
        &mut self,
        reading: u16,
        now: Instant,
        direction: Direction,
    ) -> Option<TickEvent> {
        self.sample(reading < LOW_THRESHOLD, reading > HIGH_THRESHOLD, now, direction)
    }

    /// One sampling pass. `direction` is the last commanded motor direction; the
    /// sensor itself cannot tell which way the disk turns.
    pub fn sample(
        &mut self,
        below_low: bool,
        above_high: bool,
        now: Instant,
        direction: Direction,
    ) -> Option<TickEvent> {
        if below_low && self.state.armed {
            let s = &mut self.state;
            s.armed = false;
            s.last_tick_period = now.saturating_duration_since(s.last_tick_at);
            s.last_tick_at = now;
            match direction {
                Direction::Forward => {
                    if s.tick_count >= TICKS_PER_ROTATION - 1 {
                        s.tick_count = 0;
                        s.rotation_count = s.rotation_count.wrapping_add(1);
                    } else {
                        s.tick_count += 1;
                    }
                }
                Direction::Reverse => {
                    if s.tick_count == 0 {
                        s.tick_count = TICKS_PER_ROTATION - 1;
                        s.rotation_count = s.rotation_count.wrapping_sub(1);
                    } else {
                        s.tick_count -= 1;
                    }
                }
            }
            return Some(TickEvent {
                tick: s.tick_count,
                rotation: s.rotation_count,
                period: s.last_tick_period,
                at: now,
            });
        }
        if above_high {
            self.state.armed = true;
        }
        None
    }

    /// Re-zero the tick index at the current physical position.
    pub fn rezero(&mut self) {
        self.state.tick_count = 0;
    }

    /// Zero both tick and rotation counts.
    pub fn reset_counts(&mut self) {
        self.state.tick_count = 0;
        self.state.rotation_count = 0;
    }
}
