//! Tick-position controller.
//!
//! A PID-shaped law on the raw tick error:
//!
//! ```text
//! command = kp*e + kd*(e - e_prev) + ki*sum(e)
//! ```
//!
//! The command is truncated toward zero and handed to the actuator, which does
//! the only clamping. Errors are in whole ticks, so the D and I terms are coarse;
//! one rotation of mechanical tolerance makes that acceptable.

use crate::axis::ServoAxis;
use crate::config::ControllerGains;
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerState {
    pub previous_error: i32,
    pub accumulated_error: i64,
}

#[derive(Debug, Clone)]
pub struct PositionController {
    gains: ControllerGains,
    state: ControllerState,
}

impl Default for PositionController {
    fn default() -> Self {
        Self::new(ControllerGains::default())
    }
}

impl PositionController {
    pub fn new(gains: ControllerGains) -> Self {
        Self {
            gains,
            state: ControllerState::default(),
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn gains(&self) -> &ControllerGains {
        &self.gains
    }

    /// Control law for one cycle. Returns the speed command and updates history.
    pub fn update(&mut self, target_tick: u16, tick_count: u16) -> (i32, bool) {
        let error = i32::from(target_tick) - i32::from(tick_count);
        let g = &self.gains;
        let raw = g.kp * f64::from(error)
            + g.kd * f64::from(error - self.state.previous_error)
            + g.ki * self.state.accumulated_error as f64;
        let command = raw.trunc().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32;

        self.state.previous_error = error;
        let mut acc = self.state.accumulated_error.saturating_add(i64::from(error));
        if let Some(limit) = g.integral_limit {
            let limit = limit.abs();
            acc = acc.clamp(-limit, limit);
        }
        self.state.accumulated_error = acc;

        (command, error == 0)
    }

    /// One closed-loop cycle: sample, compute, actuate. Returns true when the
    /// tick count equals `target_tick` after the sample.
    pub fn step<A: ServoAxis + ?Sized>(&mut self, axis: &mut A, target_tick: u16) -> Result<bool> {
        axis.sample()?;
        let tick = axis.encoder().tick_count;
        let (command, reached) = self.update(target_tick, tick);
        axis.set_speed(command);
        Ok(reached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::Direction;
    use crate::config::{ControllerGains, TICKS_PER_ROTATION};
    use crate::encoder::{EncoderState, EncoderTracker, TickEvent};
    use std::time::{Duration, Instant};

    /// Axis whose tracker advances exactly one tick per sample.
    struct OneTickPerSample {
        tracker: EncoderTracker,
        now: Instant,
        speeds: Vec<i32>,
    }

    impl OneTickPerSample {
        fn new() -> Self {
            let now = Instant::now();
            Self {
                tracker: EncoderTracker::new(now),
                now,
                speeds: Vec::new(),
            }
        }
    }

    impl ServoAxis for OneTickPerSample {
        fn sample(&mut self) -> Result<Option<TickEvent>> {
            self.now += Duration::from_millis(1);
            self.tracker.sample(false, true, self.now, Direction::Forward);
            Ok(self.tracker.sample(true, false, self.now, Direction::Forward))
        }
        fn encoder(&self) -> &EncoderState {
            self.tracker.state()
        }
        fn rezero(&mut self) {
            self.tracker.rezero();
        }
        fn reset_counts(&mut self) {
            self.tracker.reset_counts();
        }
        fn set_speed(&mut self, speed: i32) {
            self.speeds.push(speed);
        }
        fn stop(&mut self) {}
        fn now(&self) -> Instant {
            self.now
        }
        fn sleep(&self, _d: Duration) {}
    }

    #[test]
    fn reaches_33_on_the_33rd_call() {
        let mut axis = OneTickPerSample::new();
        let mut ctl = PositionController::default();
        for call in 1..=32 {
            assert!(!ctl.step(&mut axis, 33).unwrap(), "call {call} reported reached");
        }
        assert!(ctl.step(&mut axis, 33).unwrap());
        assert_eq!(axis.encoder().tick_count, 33);
        assert_eq!(axis.speeds.len(), 33);
    }

    #[test]
    fn first_command_has_p_and_d_terms() {
        let mut ctl = PositionController::default();
        // e=10, e_prev=0, sum=0 -> 7.5 + 7.5 = 15
        assert_eq!(ctl.update(10, 0), (15, false));
        // e=10, e_prev=10, sum=10 -> 7.5 + 0 + 0.01 = 7.51 -> 7
        assert_eq!(ctl.update(10, 0), (7, false));
        assert_eq!(ctl.state().accumulated_error, 20);
    }

    #[test]
    fn negative_error_commands_reverse() {
        let mut ctl = PositionController::default();
        let (cmd, reached) = ctl.update(5, 30);
        assert!(cmd < 0);
        assert!(!reached);
    }

    #[test]
    fn small_error_truncates_to_zero_until_integral_builds() {
        let mut ctl = PositionController::default();
        ctl.update(1, 0);
        let mut calls = 0;
        loop {
            let (cmd, _) = ctl.update(1, 0);
            calls += 1;
            if cmd != 0 {
                break;
            }
        }
        // 0.75 + 0.001*sum >= 1 once sum reaches ~250
        assert!((249..=251).contains(&calls), "calls = {calls}");
    }

    #[test]
    fn integral_is_unbounded_by_default() {
        let mut ctl = PositionController::default();
        for _ in 0..10_000 {
            ctl.update(TICKS_PER_ROTATION - 1, 0);
        }
        assert_eq!(ctl.state().accumulated_error, 370_000);
    }

    #[test]
    fn integral_limit_clamps_when_configured() {
        let mut ctl = PositionController::new(ControllerGains {
            integral_limit: Some(100),
            ..ControllerGains::default()
        });
        for _ in 0..50 {
            ctl.update(0, 20);
        }
        assert_eq!(ctl.state().accumulated_error, -100);
    }

    #[test]
    fn reached_reports_zero_error_only() {
        let mut ctl = PositionController::default();
        assert!(ctl.update(7, 7).1);
        assert!(!ctl.update(7, 8).1);
    }
}
