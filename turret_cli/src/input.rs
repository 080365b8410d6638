//! Host command source: bytes in, decoded commands out over a channel.

use std::io::{self, Read};
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use turret_core::protocol::{Command, LineAssembler};

/// Decode everything `reader` yields and forward valid commands.
///
/// Malformed lines are logged and skipped. Returns the number of commands
/// sent; stops early if the receiving side has gone away.
pub fn pump<R: Read>(mut reader: R, tx: &Sender<Command>) -> usize {
    let mut assembler = LineAssembler::new();
    let mut buf = [0u8; 256];
    let mut sent = 0;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!(error = %e, "command input failed");
                break;
            }
        };
        for decoded in assembler.feed(&buf[..n]) {
            match decoded {
                Ok(cmd) => {
                    if tx.send(cmd).is_err() {
                        return sent;
                    }
                    sent += 1;
                }
                Err(e) => tracing::warn!(error = %e, "rejected command line"),
            }
        }
    }
    if assembler.pending() > 0 {
        tracing::debug!(
            bytes = assembler.pending(),
            "discarding unterminated line at end of input"
        );
    }
    sent
}

/// Read stdin on a helper thread until EOF.
pub fn spawn_stdin_reader(tx: Sender<Command>) -> io::Result<JoinHandle<usize>> {
    thread::Builder::new()
        .name("turret-serial".into())
        .spawn(move || pump(io::stdin().lock(), &tx))
}
