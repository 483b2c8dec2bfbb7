use std::io::{Read, Write};

use proptest::prelude::*;
use xzstream::{DecoderConfig, EncoderConfig, XzReader, XzWriter};

fn config(level: u32) -> EncoderConfig {
    EncoderConfig::new(1, level).unwrap()
}

/// Reader that hands out at most the next `sizes` entry per call.
struct Ragged<'a> {
    data: &'a [u8],
    sizes: Vec<usize>,
    call: usize,
}

impl Read for Ragged<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let limit = self.sizes[self.call % self.sizes.len()].max(1);
        self.call += 1;
        let n = buf.len().min(limit).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_one_shot_roundtrip(
        data in proptest::collection::vec(any::<u8>(), 0..8192),
        level in 0u32..=3u32
    ) {
        let packed = xzstream::encode(&data, &config(level)).unwrap();
        let plain = xzstream::decode(&packed, &DecoderConfig::default()).unwrap();
        prop_assert_eq!(plain, data);
    }

    #[test]
    fn prop_streaming_equals_one_shot(
        data in proptest::collection::vec(any::<u8>(), 1..8192),
        cuts in proptest::collection::vec(1usize..2048, 1..16),
        level in 0u32..=3u32
    ) {
        let cfg = config(level);
        let expected = xzstream::encode(&data, &cfg).unwrap();

        let mut w = XzWriter::with_config(Vec::new(), &cfg).unwrap();
        let mut rest = &data[..];
        for cut in cuts.iter().cycle() {
            if rest.is_empty() {
                break;
            }
            let n = (*cut).min(rest.len());
            w.write_all(&rest[..n]).unwrap();
            rest = &rest[n..];
        }
        prop_assert_eq!(w.finish().unwrap(), expected);
    }

    #[test]
    fn prop_ragged_upstream_and_reads(
        data in proptest::collection::vec(any::<u8>(), 0..8192),
        upstream in proptest::collection::vec(1usize..512, 1..8),
        reads in proptest::collection::vec(1usize..1024, 1..8),
        stage in 1usize..256
    ) {
        let packed = xzstream::encode(&data, &config(1)).unwrap();
        let source = Ragged { data: &packed, sizes: upstream, call: 0 };
        let cfg = DecoderConfig { buffer_size: stage, ..DecoderConfig::default() };
        let mut r = XzReader::with_config(source, &cfg).unwrap();

        let mut out = Vec::new();
        let mut buf = vec![0u8; 1024];
        for want in reads.iter().cycle() {
            let n = r.read(&mut buf[..*want]).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        prop_assert_eq!(out, data);
    }

    #[test]
    fn prop_garbage_never_panics(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let _ = xzstream::decode(&data, &DecoderConfig::default());
        let mut r = XzReader::new(&data[..]).unwrap();
        let mut sink = Vec::new();
        let _ = r.read_to_end(&mut sink);
    }
}
