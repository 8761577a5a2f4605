#![no_main]

use libfuzzer_sys::fuzz_target;
use qfs::{decompress, Encoder, Error};

fuzz_target!(|data: &[u8]| {
    // Skip very large inputs to avoid OOM
    if data.len() > 1_000_000 {
        return;
    }

    let forced = Encoder::new().keep_unprofitable(true);
    for encoder in [Encoder::fast(), Encoder::new(), Encoder::best(), forced] {
        let compressed = match encoder.compress(data) {
            Ok(compressed) => compressed,
            // Only possible when the input cannot be stored raw
            Err(Error::EncodeOverflow { .. }) => continue,
            Err(e) => panic!("unexpected compress error: {}", e),
        };
        // Raw entries below the minimum size may carry a stray signature
        if data.len() < qfs::MIN_UNCOMPRESSED_SIZE {
            continue;
        }
        let decompressed = decompress(&compressed).expect("decompress failed");
        assert_eq!(data, &decompressed[..], "roundtrip failed");
    }
});
