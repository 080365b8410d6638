//! End-to-end calibration against the simulated disk.

use std::sync::Arc;
use std::time::Duration;

use rstest::rstest;
use turret_core::config::{DEFAULT_SPEED, HOME_OFFSET_TICK, TICKS_PER_ROTATION};
use turret_core::error::TurretError;
use turret_core::mocks::{RecordingTelemetry, Sample};
use turret_core::status::{CALIBRATING_COLOR, READY_COLOR};
use turret_core::{CalibrationCfg, CalibrationPhase, Turret, TurretMode};
use turret_hardware::{DiskCfg, SimulatedDisk};
use turret_traits::ManualClock;

fn sim(cfg: DiskCfg) -> SimulatedDisk {
    SimulatedDisk::new(cfg, ManualClock::new()).expect("sim disk")
}

fn turret_on(disk: &SimulatedDisk, telemetry: RecordingTelemetry, cal: CalibrationCfg) -> Turret {
    Turret::builder()
        .with_encoder(disk.encoder())
        .with_motor(disk.motor())
        .with_range_finder(disk.range_finder())
        .with_status_led(disk.led())
        .with_telemetry(telemetry)
        .with_clock(Arc::new(disk.clock().clone()))
        .with_calibration(cal)
        .build()
        .expect("build")
}

#[rstest]
#[case(12)]
#[case(0)]
#[case(37)]
fn calibration_parks_home_offset_past_the_wide_slot(#[case] home_slot: usize) {
    let disk = sim(DiskCfg {
        home_slot,
        ..DiskCfg::default()
    });
    let mut t = turret_on(&disk, RecordingTelemetry::new(), CalibrationCfg::default());

    let res = t.start().expect("calibration");
    assert!(res.completed);
    assert_eq!(t.mode(), TurretMode::Running);
    assert_eq!(t.encoder().tick_count, 0);
    let expected = (home_slot + usize::from(HOME_OFFSET_TICK)) % usize::from(TICKS_PER_ROTATION);
    assert_eq!(disk.slot_under_sensor(), expected);
    // three slot widths at spin-up speed
    assert!(res.slowest_period > Duration::from_millis(15));
}

#[test]
fn calibration_hands_over_at_default_speed_with_green_led() {
    let disk = sim(DiskCfg::default());
    let mut t = turret_on(&disk, RecordingTelemetry::new(), CalibrationCfg::default());
    assert_eq!(disk.led_color(), [0, 0, 0]);
    let before = disk.clock().elapsed();

    t.start().expect("calibration");
    assert_eq!(disk.led_color(), READY_COLOR);
    assert_ne!(disk.led_color(), CALIBRATING_COLOR);
    assert_eq!(t.command().magnitude as i32, DEFAULT_SPEED);
    assert_eq!(disk.duty(), 178);
    assert_eq!(disk.direction_lines(), (false, true));
    // spin-up and final holds alone account for 1.25 s
    assert!(disk.clock().elapsed() - before >= Duration::from_millis(1250));
}

#[test]
fn running_ticks_report_encoder_and_distance() {
    let disk = sim(DiskCfg::default());
    let telemetry = RecordingTelemetry::new();
    let mut t = turret_on(&disk, telemetry.clone(), CalibrationCfg::default());
    t.start().expect("calibration");

    let mut ticks = 0;
    while ticks < usize::from(TICKS_PER_ROTATION) {
        if t.tick().expect("tick").is_some() {
            ticks += 1;
        }
    }
    // calibration re-zeroes the tick only; its measuring rotation still counts
    assert_eq!(t.encoder().tick_count, 0);
    assert_eq!(t.encoder().rotation_count, 2);

    let samples = telemetry.samples();
    assert_eq!(samples.len(), 2 * usize::from(TICKS_PER_ROTATION));
    assert_eq!(samples[0], Sample::Encoder { tick: 1, rotation: 1 });
    assert!(matches!(samples[1], Sample::Distance(cm) if cm >= 250));
}

#[test]
fn stalled_motor_times_out_on_every_attempt() {
    // a disk that never reaches the low band: the encoder never ticks
    let disk = sim(DiskCfg {
        max_slots_per_sec: 1e-9,
        ..DiskCfg::default()
    });
    let mut t = turret_on(
        &disk,
        RecordingTelemetry::new(),
        CalibrationCfg {
            timeout: Some(Duration::from_millis(400)),
            max_attempts: 3,
        },
    );

    let before = disk.clock().elapsed();
    let err = t.start().expect_err("must time out");
    match err.downcast_ref::<TurretError>() {
        Some(TurretError::CalibrationTimedOut { phase, elapsed_ms }) => {
            assert_eq!(*phase, CalibrationPhase::FindFirstTick);
            assert!(*elapsed_ms >= 400);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(disk.clock().elapsed() - before >= Duration::from_millis(1200));
    assert_eq!(t.mode(), TurretMode::Idle);
    assert_eq!(disk.duty(), 0);
    assert_eq!(disk.led_color(), CALIBRATING_COLOR);
}
