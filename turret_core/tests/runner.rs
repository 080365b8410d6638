use std::cell::Cell;
use std::error::Error;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use turret_core::mocks::{RecordingTelemetry, Sample};
use turret_core::runner::{RunParams, StopReason, run};
use turret_core::{Command, Turret, TurretMode};
use turret_hardware::sim::SimulatedEncoder;
use turret_hardware::{DiskCfg, SimulatedDisk};
use turret_traits::{EncoderSensor, ManualClock};

/// Forwards to the simulated encoder until `broken` is set.
struct BreakableEncoder {
    inner: SimulatedEncoder,
    broken: Rc<Cell<bool>>,
}

impl EncoderSensor for BreakableEncoder {
    fn read(&mut self) -> Result<u16, Box<dyn Error + Send + Sync>> {
        if self.broken.get() {
            return Err("adc unplugged".into());
        }
        self.inner.read()
    }
}

fn setup(telemetry: RecordingTelemetry) -> (SimulatedDisk, Turret) {
    let disk = SimulatedDisk::new(DiskCfg::default(), ManualClock::new()).expect("sim");
    let turret = Turret::builder()
        .with_encoder(disk.encoder())
        .with_motor(disk.motor())
        .with_range_finder(disk.range_finder())
        .with_status_led(disk.led())
        .with_telemetry(telemetry)
        .with_clock(Arc::new(disk.clock().clone()))
        .build()
        .expect("build");
    (disk, turret)
}

fn params(max_ms: u64) -> RunParams {
    RunParams {
        max_duration: Some(Duration::from_millis(max_ms)),
        ..RunParams::default()
    }
}

#[test]
fn shutdown_flag_exits_immediately_and_stops_motor() {
    let (disk, mut t) = setup(RecordingTelemetry::new());
    t.set_speed(80);
    let (_tx, rx) = crossbeam_channel::unbounded();
    let shutdown = AtomicBool::new(true);

    let summary = run(&mut t, &rx, &shutdown, &params(1_000)).unwrap();
    assert_eq!(summary.reason, StopReason::Shutdown);
    assert_eq!(summary.commands_applied, 0);
    assert_eq!(disk.duty(), 0);
}

#[test]
fn commands_are_applied_once_per_serial_poll() {
    let (disk, mut t) = setup(RecordingTelemetry::new());
    let (tx, rx) = crossbeam_channel::unbounded();
    for v in [40, 50, 60, 70, 80] {
        tx.send(Command::SetSpeed(v)).unwrap();
    }
    let shutdown = AtomicBool::new(false);

    let summary = run(&mut t, &rx, &shutdown, &params(250)).unwrap();
    assert_eq!(summary.reason, StopReason::Duration);
    // polls at 0, 100 and 200 ms
    assert_eq!(summary.commands_applied, 3);
    assert_eq!(rx.len(), 2);
    assert_eq!(summary.final_mode, TurretMode::Idle);
    assert!(summary.elapsed >= Duration::from_millis(250));
    assert_eq!(disk.duty(), 0);
}

#[test]
fn start_command_calibrates_then_streams_telemetry() {
    let telemetry = RecordingTelemetry::new();
    let (disk, mut t) = setup(telemetry.clone());
    let (tx, rx) = crossbeam_channel::unbounded();
    tx.send(Command::Start).unwrap();
    drop(tx);
    let shutdown = AtomicBool::new(false);

    let summary = run(&mut t, &rx, &shutdown, &params(4_000)).unwrap();
    assert_eq!(summary.reason, StopReason::Duration);
    assert_eq!(summary.commands_applied, 1);
    assert_eq!(summary.final_mode, TurretMode::Running);
    assert!(summary.ticks > 38, "ticks = {}", summary.ticks);

    let samples = telemetry.samples();
    let encoder = samples
        .iter()
        .filter(|s| matches!(s, Sample::Encoder { .. }))
        .count() as u64;
    assert_eq!(encoder, summary.ticks);
    assert!(samples.iter().any(|s| matches!(s, Sample::Distance(_))));
    assert_eq!(disk.duty(), 0);
}

#[test]
fn autostart_runs_without_a_command() {
    let (_disk, mut t) = setup(RecordingTelemetry::new());
    let (_tx, rx) = crossbeam_channel::unbounded();
    let shutdown = AtomicBool::new(false);
    let p = RunParams {
        autostart: true,
        sample_rate_hz: Some(1000),
        ..params(4_000)
    };

    let summary = run(&mut t, &rx, &shutdown, &p).unwrap();
    assert_eq!(summary.commands_applied, 1);
    assert_eq!(summary.final_mode, TurretMode::Running);
    assert!(summary.ticks > 0);
}

#[test]
fn stop_command_pauses_the_loop() {
    let (_disk, mut t) = setup(RecordingTelemetry::new());
    let (tx, rx) = crossbeam_channel::unbounded();
    tx.send(Command::Start).unwrap();
    tx.send(Command::Stop).unwrap();
    let shutdown = AtomicBool::new(false);

    let summary = run(&mut t, &rx, &shutdown, &params(5_000)).unwrap();
    assert_eq!(summary.commands_applied, 2);
    assert_eq!(summary.final_mode, TurretMode::Paused);
}

#[test]
fn encoder_failure_while_running_stops_motor() {
    let disk = SimulatedDisk::new(DiskCfg::default(), ManualClock::new()).expect("sim");
    let broken = Rc::new(Cell::new(false));
    let mut t = Turret::builder()
        .with_encoder(BreakableEncoder {
            inner: disk.encoder(),
            broken: broken.clone(),
        })
        .with_motor(disk.motor())
        .with_telemetry(RecordingTelemetry::new())
        .with_clock(Arc::new(disk.clock().clone()))
        .build()
        .expect("build");
    t.start().expect("calibrate");
    assert_eq!(t.mode(), TurretMode::Running);
    assert!(disk.duty() > 0);

    broken.set(true);
    let (_tx, rx) = crossbeam_channel::unbounded();
    let shutdown = AtomicBool::new(false);
    let err = run(&mut t, &rx, &shutdown, &params(1_000)).expect_err("read failure");
    assert!(!err.to_string().is_empty());
    assert_eq!(disk.duty(), 0);
}
