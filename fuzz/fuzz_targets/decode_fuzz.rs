#![no_main]
use std::io::Read;

use libfuzzer_sys::fuzz_target;
use xzstream::{DecoderConfig, XzReader};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must only ever produce errors, never panics.
    let cfg = DecoderConfig {
        memlimit: 64 * 1024 * 1024,
        ..DecoderConfig::default()
    };
    let _ = xzstream::decode(data, &cfg);

    // Same input through the reader with a tiny stage.
    let small = DecoderConfig {
        buffer_size: 7,
        ..cfg
    };
    if let Ok(mut r) = XzReader::with_config(data, &small) {
        let mut out = Vec::new();
        let _ = r.read_to_end(&mut out);
    }
});
