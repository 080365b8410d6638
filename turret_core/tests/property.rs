use std::time::{Duration, Instant};

use proptest::prelude::*;
use turret_core::actuator::{clamp_magnitude, magnitude_to_duty};
use turret_core::config::{HIGH_THRESHOLD, LOW_THRESHOLD, MAX_SPEED, MIN_SPEED, TICKS_PER_ROTATION};
use turret_core::{Direction, EncoderTracker, PositionController};

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Forward), Just(Direction::Reverse)]
}

prop_compose! {
    /// Readings mixed with a direction that flips now and then.
    fn trace()(
        steps in prop::collection::vec((0u16..=1023, direction()), 1..2000),
    ) -> Vec<(u16, Direction)> {
        steps
    }
}

proptest! {
    #[test]
    fn tick_count_stays_in_range(steps in trace()) {
        let t0 = Instant::now();
        let mut t = EncoderTracker::new(t0);
        for (i, (reading, dir)) in steps.into_iter().enumerate() {
            t.sample_raw(reading, t0 + Duration::from_micros(i as u64 * 500), dir);
            prop_assert!(t.state().tick_count < TICKS_PER_ROTATION);
        }
    }

    #[test]
    fn ticks_equal_armed_low_transitions(steps in trace()) {
        // reference model of the latch, counted independently
        let t0 = Instant::now();
        let mut t = EncoderTracker::new(t0);
        let mut armed = false;
        let mut expected = 0usize;
        let mut fired = 0usize;
        for (reading, dir) in steps {
            if reading < LOW_THRESHOLD && armed {
                armed = false;
                expected += 1;
            } else if reading > HIGH_THRESHOLD {
                armed = true;
            }
            if t.sample_raw(reading, t0, dir).is_some() {
                fired += 1;
            }
        }
        prop_assert_eq!(fired, expected);
    }

    #[test]
    fn band_oscillation_never_ticks(readings in prop::collection::vec(LOW_THRESHOLD..=HIGH_THRESHOLD, 1..500)) {
        let t0 = Instant::now();
        let mut t = EncoderTracker::new(t0);
        // arm, fire once, then wander inside the band
        t.sample_raw(900, t0, Direction::Forward);
        prop_assert!(t.sample_raw(0, t0, Direction::Forward).is_some());
        for r in readings {
            prop_assert!(t.sample_raw(r, t0, Direction::Forward).is_none());
        }
        prop_assert_eq!(t.state().tick_count, 1);
    }

    #[test]
    fn forward_then_reverse_rotation_returns_home(rotations in 1u32..5) {
        let t0 = Instant::now();
        let mut t = EncoderTracker::new(t0);
        let n = u32::from(TICKS_PER_ROTATION) * rotations;
        for _ in 0..n {
            t.sample_raw(900, t0, Direction::Forward);
            t.sample_raw(100, t0, Direction::Forward);
        }
        prop_assert_eq!(t.state().tick_count, 0);
        prop_assert_eq!(t.state().rotation_count, rotations as i32);
        for _ in 0..n {
            t.sample_raw(900, t0, Direction::Reverse);
            t.sample_raw(100, t0, Direction::Reverse);
        }
        prop_assert_eq!(t.state().tick_count, 0);
        prop_assert_eq!(t.state().rotation_count, 0);
    }

    #[test]
    fn magnitude_is_zero_or_in_band(v in any::<i32>()) {
        let m = i32::from(clamp_magnitude(v));
        if v == 0 {
            prop_assert_eq!(m, 0);
        } else {
            prop_assert!((MIN_SPEED..=MAX_SPEED).contains(&m));
        }
        prop_assert_eq!(magnitude_to_duty(m as u8) == 0, m == 0);
    }

    #[test]
    fn controller_reports_reached_iff_error_is_zero(target in 0u16..TICKS_PER_ROTATION, tick in 0u16..TICKS_PER_ROTATION) {
        let mut ctl = PositionController::default();
        let (_, reached) = ctl.update(target, tick);
        prop_assert_eq!(reached, target == tick);
    }
}
