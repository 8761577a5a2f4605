#![no_main]

use libfuzzer_sys::fuzz_target;
use qfs::opcode::{opcodes, Opcode};

fuzz_target!(|data: &[u8]| {
    // The opcode walk must terminate with strictly increasing offsets
    let mut last = None;
    let mut produced = 0usize;
    let mut clean = true;
    for r in opcodes(data) {
        match r {
            Ok((offset, op)) => {
                assert!(last.map_or(true, |l| offset > l));
                last = Some(offset);
                if !matches!(op, Opcode::Stop { .. }) {
                    produced += op.output_len();
                }
            }
            Err(_) => clean = false,
        }
    }

    // Everything before the stop opcode lands in the output
    if clean && qfs::is_compressed(data) {
        if let Ok(out) = qfs::decompress(data) {
            assert!(out.len() >= produced);
        }
    }
});
