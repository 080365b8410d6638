//! Line protocol spoken over the serial link.
//!
//! Host to turret, one command per `\n`-terminated line:
//!
//! | line        | meaning                                 |
//! |-------------|-----------------------------------------|
//! | `B`         | start: calibrate, then run              |
//! | `E`         | stop the motor and pause                |
//! | `D<n>`      | direction, non-zero is forward          |
//! | `M<n>`      | signed motor speed, clamped by the core |
//!
//! Turret to host: the identification line once at startup, then
//! `"{tick}\t{rotation}\n"` per encoder tick and `"{cm}\n"` per distance sample.

use thiserror::Error;

/// Identification line written once at startup.
pub const WHO_AM_I: &str = "iamlidar\n";

/// Longest line the assembler buffers before discarding it.
pub const MAX_LINE_LEN: usize = 64;

/// A decoded host command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    SetDirection { forward: bool },
    SetSpeed(i32),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty command line")]
    Empty,
    #[error("unknown command type {0:?}")]
    UnknownCommand(char),
    #[error("command {cmd:?} needs an integer argument")]
    MissingArgument { cmd: char },
    #[error("command {cmd:?} has invalid argument {arg:?}")]
    InvalidArgument { cmd: char, arg: String },
    #[error("line longer than {MAX_LINE_LEN} bytes discarded")]
    Overlong,
}

/// Decode one command line (without its `\n`).
///
/// Leading whitespace and trailing whitespace (including `\r`) are ignored.
/// `B` and `E` ignore anything after the command letter.
pub fn parse_command(line: &str) -> Result<Command, ProtocolError> {
    let line = line.trim();
    let mut chars = line.chars();
    let cmd = chars.next().ok_or(ProtocolError::Empty)?;
    let rest = chars.as_str();
    match cmd {
        'B' => Ok(Command::Start),
        'E' => Ok(Command::Stop),
        'D' => parse_int(cmd, rest).map(|v| Command::SetDirection { forward: v != 0 }),
        'M' => parse_int(cmd, rest).map(Command::SetSpeed),
        other => Err(ProtocolError::UnknownCommand(other)),
    }
}

fn parse_int(cmd: char, arg: &str) -> Result<i32, ProtocolError> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Err(ProtocolError::MissingArgument { cmd });
    }
    arg.parse::<i32>().map_err(|_| ProtocolError::InvalidArgument {
        cmd,
        arg: arg.to_string(),
    })
}

/// Accumulates raw bytes into lines.
#[derive(Debug, Default, Clone)]
pub struct LineAssembler {
    buf: Vec<u8>,
    overflowed: bool,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns a complete line when `byte` is `\n`.
    ///
    /// Lines over [`MAX_LINE_LEN`] are dropped whole and reported as
    /// [`ProtocolError::Overlong`] at their terminator. Invalid UTF-8 is
    /// replaced lossily and then fails to parse.
    pub fn push(&mut self, byte: u8) -> Option<Result<String, ProtocolError>> {
        if byte == b'\n' {
            let overflowed = std::mem::replace(&mut self.overflowed, false);
            let line = std::mem::take(&mut self.buf);
            if overflowed {
                return Some(Err(ProtocolError::Overlong));
            }
            return Some(Ok(String::from_utf8_lossy(&line).into_owned()));
        }
        if self.buf.len() >= MAX_LINE_LEN {
            self.overflowed = true;
            self.buf.clear();
        } else if !self.overflowed {
            self.buf.push(byte);
        }
        None
    }

    /// Feed a chunk and decode every completed line.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<Command, ProtocolError>> {
        bytes
            .iter()
            .filter_map(|&b| self.push(b))
            .map(|line| line.and_then(|l| parse_command(&l)))
            .collect()
    }

    /// Bytes held for the current, unterminated line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Encoder telemetry line.
pub fn encoder_line(tick: u16, rotation: i32) -> String {
    format!("{tick}\t{rotation}\n")
}

/// Distance telemetry line.
pub fn distance_line(cm: u16) -> String {
    format!("{cm}\n")
}
