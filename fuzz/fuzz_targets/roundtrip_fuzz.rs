#![no_main]
use std::io::Write;

use libfuzzer_sys::fuzz_target;
use xzstream::{DecoderConfig, EncoderConfig, XzWriter};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte picks the level and the write chunk size.
    let control = data[0];
    let payload = &data[1..];
    let level = u32::from(control % 4);
    let chunk = usize::from(control / 4).max(1);

    let cfg = EncoderConfig::new(1, level).unwrap();
    let one_shot = xzstream::encode(payload, &cfg).unwrap();

    let mut w = XzWriter::with_config(Vec::new(), &cfg).unwrap();
    for piece in payload.chunks(chunk) {
        w.write_all(piece).unwrap();
    }
    let streamed = w.finish().unwrap();
    assert_eq!(streamed, one_shot);

    let decoded = xzstream::decode(&one_shot, &DecoderConfig::default()).unwrap();
    assert_eq!(decoded, payload);
});
