#![no_main]
use libfuzzer_sys::fuzz_target;
use turret_core::protocol::{LineAssembler, MAX_LINE_LEN, parse_command};

fuzz_target!(|data: &[u8]| {
    let mut assembler = LineAssembler::new();
    let _ = assembler.feed(data);
    assert!(assembler.pending() <= MAX_LINE_LEN);

    if let Ok(line) = std::str::from_utf8(data) {
        let _ = parse_command(line);
    }
});
