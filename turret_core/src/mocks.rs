//! Stand-in collaborators for a turret wired without some peripherals.

use std::sync::{Arc, Mutex};

/// A range finder that is not fitted; every poll errors.
pub struct NoRangeFinder;

impl turret_traits::RangeFinder for NoRangeFinder {
    fn distance(&mut self) -> Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("no range finder")))
    }
}

/// Telemetry sink that drops everything.
pub struct NullTelemetry;

impl turret_traits::Telemetry for NullTelemetry {
    fn encoder(
        &mut self,
        _tick: u16,
        _rotation: i32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }

    fn distance(&mut self, _cm: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// One recorded telemetry sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    Encoder { tick: u16, rotation: i32 },
    Distance(u16),
}

/// Telemetry sink that keeps every sample; clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingTelemetry {
    samples: Arc<Mutex<Vec<Sample>>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.samples.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn push(&self, s: Sample) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.samples
            .lock()
            .map_err(|_| std::io::Error::other("telemetry log poisoned"))?
            .push(s);
        Ok(())
    }
}

impl turret_traits::Telemetry for RecordingTelemetry {
    fn encoder(
        &mut self,
        tick: u16,
        rotation: i32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.push(Sample::Encoder { tick, rotation })
    }

    fn distance(&mut self, cm: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.push(Sample::Distance(cm))
    }
}
