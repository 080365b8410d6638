//! Telemetry sink writing to stdout, either as protocol lines or as JSON lines.

use std::io::{self, Write};

use serde_json::json;
use turret_core::protocol::{WHO_AM_I, distance_line, encoder_line};
use turret_traits::Telemetry;

type SinkResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone, Copy)]
pub struct StdoutTelemetry {
    json: bool,
}

impl StdoutTelemetry {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Identification line, written once before any sample.
    pub fn announce(&self) -> io::Result<()> {
        if self.json {
            write_line(&json!({ "type": "hello", "id": WHO_AM_I.trim_end() }).to_string())
        } else {
            write_raw(WHO_AM_I)
        }
    }
}

impl Telemetry for StdoutTelemetry {
    fn encoder(&mut self, tick: u16, rotation: i32) -> SinkResult {
        if self.json {
            write_line(&json!({ "type": "encoder", "tick": tick, "rotation": rotation }).to_string())?;
        } else {
            write_raw(&encoder_line(tick, rotation))?;
        }
        Ok(())
    }

    fn distance(&mut self, cm: u16) -> SinkResult {
        if self.json {
            write_line(&json!({ "type": "distance", "cm": cm }).to_string())?;
        } else {
            write_raw(&distance_line(cm))?;
        }
        Ok(())
    }
}

fn write_line(s: &str) -> io::Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(s.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()
}

fn write_raw(s: &str) -> io::Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(s.as_bytes())?;
    out.flush()
}
