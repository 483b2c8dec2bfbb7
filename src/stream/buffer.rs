// One-shot buffer codec.
//
// Drives a session over an in-memory slice through small fixed staging
// buffers and collects the result in a growable `Vec`.

use super::driver::{Driver, Phase};
use crate::config::{DecoderConfig, EncoderConfig};
use crate::engine::{Engine, Liblzma, Session};
use crate::error::Result;

const STAGING: usize = 4 * 1024;

/// Compress `data` into a complete `.xz` stream.
///
/// Empty input yields empty output and never creates a session.
pub fn encode(data: &[u8], config: &EncoderConfig) -> Result<Vec<u8>> {
    encode_with_engine(data, &Liblzma, config)
}

/// Decompress `.xz` / `.lzma` data, including concatenated streams.
///
/// Empty input yields empty output and never creates a session.
pub fn decode(data: &[u8], config: &DecoderConfig) -> Result<Vec<u8>> {
    decode_with_engine(data, &Liblzma, config)
}

pub fn encode_with_engine<E: Engine>(
    data: &[u8],
    engine: &E,
    config: &EncoderConfig,
) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let session = config.open(engine)?;
    run(session, data, Vec::with_capacity(data.len() / 2 + 64))
}

pub fn decode_with_engine<E: Engine>(
    data: &[u8],
    engine: &E,
    config: &DecoderConfig,
) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let session = config.open(engine)?;
    run(session, data, Vec::with_capacity(data.len().saturating_mul(3)))
}

fn run<S: Session>(session: S, data: &[u8], mut out: Vec<u8>) -> Result<Vec<u8>> {
    let mut driver = Driver::new(session, STAGING, STAGING)?;
    let mut rest = data;
    loop {
        match driver.phase() {
            Phase::Done => return Ok(out),
            Phase::Draining => {
                out.extend_from_slice(driver.output.unread());
                driver.output.clear();
            }
            Phase::AwaitingInput => {
                let n = driver.stage(rest);
                rest = &rest[n..];
                if rest.is_empty() {
                    driver.finish_input();
                }
            }
            Phase::Stepping | Phase::Flushing | Phase::Finishing => driver.step()?,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Status;
    use crate::engine::testing::{Behavior, Counters, StoreEngine};
    use crate::error::Error;

    #[test]
    fn empty_input_creates_no_session() {
        let engine = StoreEngine::new(16);
        assert!(encode_with_engine(&[], &engine, &EncoderConfig::default())
            .unwrap()
            .is_empty());
        assert!(decode_with_engine(&[], &engine, &DecoderConfig::default())
            .unwrap()
            .is_empty());
        assert_eq!(Counters::get(&engine.counters.created), 0);
    }

    #[test]
    fn store_engine_crosses_staging_boundaries() {
        let engine = StoreEngine::new(1000);
        let data: Vec<u8> = (0..3 * STAGING + 17).map(|i| (i * 7) as u8).collect();
        let out = encode_with_engine(&data, &engine, &EncoderConfig::default()).unwrap();
        assert_eq!(out, data);
        assert_eq!(Counters::get(&engine.counters.released), 1);
        assert_eq!(Counters::get(&engine.counters.steps_after_end), 0);
    }

    #[test]
    fn exact_multiple_of_staging() {
        let engine = StoreEngine::new(STAGING);
        let data = vec![9u8; 2 * STAGING];
        assert_eq!(
            decode_with_engine(&data, &engine, &DecoderConfig::default()).unwrap(),
            data
        );
    }

    #[test]
    fn failure_releases_session() {
        let engine = StoreEngine::new(16).with_behavior(Behavior::FailAt {
            at: 2,
            status: Status::DataError,
        });
        let err = decode_with_engine(&[1u8; 100], &engine, &DecoderConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Engine {
                status: Status::DataError
            }
        ));
        assert_eq!(Counters::get(&engine.counters.released), 1);
    }

    #[test]
    fn liblzma_round_trip() {
        let data = b"one-shot buffers, compressed and back again".repeat(200);
        let packed = encode(&data, &EncoderConfig::default()).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(decode(&packed, &DecoderConfig::default()).unwrap(), data);
    }

    #[test]
    fn concatenated_streams_decode_as_one() {
        let cfg = EncoderConfig::default();
        let mut packed = encode(b"first ", &cfg).unwrap();
        packed.extend(encode(b"second", &cfg).unwrap());
        assert_eq!(
            decode(&packed, &DecoderConfig::default()).unwrap(),
            b"first second"
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = EncoderConfig {
            threads: 0,
            ..Default::default()
        };
        assert!(matches!(
            encode(b"x", &cfg),
            Err(Error::InvalidArgument(_))
        ));
    }
}
