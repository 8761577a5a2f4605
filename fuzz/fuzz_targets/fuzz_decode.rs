#![no_main]

use libfuzzer_sys::fuzz_target;
use qfs::{decompress, Decoder};

fuzz_target!(|data: &[u8]| {
    // Arbitrary input must decode or return an error, never panic
    if let Ok(out) = decompress(data) {
        assert_eq!(out.len(), qfs::decompressed_size(data) as usize);
    }
    let _ = Decoder::strict().decompress(data);
});
