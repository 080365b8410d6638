//! Peripheral assembly: the simulated disk by default, rppal devices with
//! `--features hardware`.

use std::sync::Arc;

use eyre::WrapErr;
use turret_config::Config;
use turret_core::Turret;
use turret_traits::{Clock, EncoderSensor, MotorDriver, RangeFinder, StatusLed, Telemetry};

pub struct Devices {
    pub encoder: Box<dyn EncoderSensor>,
    pub motor: Box<dyn MotorDriver>,
    /// `None` when `[lidar] enabled = false`.
    pub range_finder: Option<Box<dyn RangeFinder>>,
    pub led: Option<Box<dyn StatusLed>>,
    pub clock: Arc<dyn Clock + Send + Sync>,
    pub backend: &'static str,
}

impl Devices {
    /// Hand the devices to a turret configured from `cfg`.
    pub fn into_turret(self, cfg: &Config, telemetry: impl Telemetry + 'static) -> eyre::Result<Turret> {
        let mut builder = Turret::builder()
            .with_encoder(self.encoder)
            .with_motor(self.motor)
            .with_clock(self.clock)
            .with_calibration((&cfg.calibration).into())
            .with_gains((&cfg.controller).into())
            .with_cfg((&cfg.lidar).into())
            .with_telemetry(telemetry);
        if let Some(rf) = self.range_finder {
            builder = builder.with_range_finder(rf);
        }
        if let Some(led) = self.led {
            builder = builder.with_status_led(led);
        }
        builder.build()
    }
}

#[cfg(not(feature = "hardware"))]
pub fn open(cfg: &Config) -> eyre::Result<Devices> {
    use turret_hardware::SimulatedDisk;
    use turret_traits::ManualClock;

    let clock = ManualClock::new();
    let disk = SimulatedDisk::new(sim::disk_cfg(&cfg.sim), clock.clone())
        .wrap_err("init simulated disk")?;
    let core_clock: Arc<dyn Clock + Send + Sync> = if cfg.sim.realtime {
        Arc::new(sim::PacedClock(clock))
    } else {
        Arc::new(clock)
    };
    let range_finder = cfg
        .lidar
        .enabled
        .then(|| Box::new(disk.range_finder()) as Box<dyn RangeFinder>);
    tracing::info!(
        slots = cfg.sim.slots,
        home_slot = cfg.sim.home_slot,
        realtime = cfg.sim.realtime,
        "using simulated turret"
    );
    Ok(Devices {
        encoder: Box::new(disk.encoder()),
        motor: Box::new(disk.motor()),
        range_finder,
        led: Some(Box::new(disk.led())),
        clock: core_clock,
        backend: "sim",
    })
}

#[cfg(feature = "hardware")]
pub fn open(cfg: &Config) -> eyre::Result<Devices> {
    use std::time::Duration;
    use turret_hardware::ads1015::Ads1015Encoder;
    use turret_hardware::lidar_lite::LidarLite;
    use turret_hardware::{HardwareLed, HardwareMotor};
    use turret_traits::MonotonicClock;

    let timeout = Duration::from_millis(cfg.hardware.i2c_timeout_ms);
    let encoder = Ads1015Encoder::new(cfg.encoder.i2c_address, cfg.encoder.channel, timeout)
        .wrap_err("open ADS1015 encoder")?;
    let p = &cfg.pins;
    let motor = HardwareMotor::new(p.motor_pwm, p.motor_in1, p.motor_in2, cfg.hardware.motor_pwm_hz)
        .wrap_err("open motor pins")?;
    let range_finder = if cfg.lidar.enabled {
        let lidar =
            LidarLite::new(cfg.lidar.i2c_address, timeout).wrap_err("open LIDAR-Lite range finder")?;
        Some(Box::new(lidar) as Box<dyn RangeFinder>)
    } else {
        None
    };
    let led = match p.led() {
        Some([r, g, b]) => {
            let led = HardwareLed::new(r, g, b, cfg.hardware.led_pwm_hz).wrap_err("open LED pins")?;
            Some(Box::new(led) as Box<dyn StatusLed>)
        }
        None => None,
    };
    Ok(Devices {
        encoder: Box::new(encoder),
        motor: Box::new(motor),
        range_finder,
        led,
        clock: Arc::new(MonotonicClock::new()),
        backend: "hardware",
    })
}

#[cfg(not(feature = "hardware"))]
mod sim {
    use std::time::{Duration, Instant};

    use turret_config::SimCfg;
    use turret_hardware::DiskCfg;
    use turret_traits::{Clock, ManualClock};

    pub fn disk_cfg(s: &SimCfg) -> DiskCfg {
        DiskCfg {
            slots: s.slots,
            home_slot: s.home_slot,
            home_width: s.home_width,
            max_slots_per_sec: s.max_slots_per_sec,
            sample_period: Duration::from_micros(s.sample_period_us),
            distance_cm: s.distance_cm,
        }
    }

    /// Simulated time whose sleeps also wait on the wall clock.
    #[derive(Debug, Clone)]
    pub struct PacedClock(pub ManualClock);

    impl Clock for PacedClock {
        fn now(&self) -> Instant {
            self.0.now()
        }

        fn sleep(&self, d: Duration) {
            self.0.sleep(d);
            std::thread::sleep(d);
        }
    }

}
