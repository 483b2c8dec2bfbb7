//! xzstream: streaming `.xz` compression over liblzma.
//!
//! The crate provides:
//! - A compressing [`Write`](std::io::Write) adapter ([`XzWriter`])
//! - A decompressing [`Read`](std::io::Read) adapter ([`XzReader`])
//! - One-shot buffer codecs ([`encode`], [`decode`])
//! - Encoder/decoder configuration, including multi-threaded compression
//!   with automatic thread clamping (`config`)
//! - The engine boundary and its liblzma implementation (`engine`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! Decoding accepts `.xz` and legacy `.lzma` input, and concatenated `.xz`
//! streams decode as one.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::io::{Read, Write};
//! use xzstream::{DecoderConfig, EncoderConfig, XzReader, XzWriter};
//!
//! let config = EncoderConfig::new(4, 6)?;
//! let mut writer = XzWriter::with_config(Vec::new(), &config)?;
//! writer.write_all(b"hello xz world")?;
//! let packed = writer.finish()?;
//!
//! let mut reader = XzReader::with_config(&packed[..], &DecoderConfig::default())?;
//! let mut plain = Vec::new();
//! reader.read_to_end(&mut plain)?;
//! assert_eq!(plain, b"hello xz world");
//!
//! let again = xzstream::decode(&xzstream::encode(&plain, &config)?, &DecoderConfig::default())?;
//! assert_eq!(again, plain);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod stream;

#[cfg(feature = "cli")]
pub mod cli;

pub use config::{DecoderConfig, DecoderFlags, EncoderConfig, Preset};
pub use engine::Check;
pub use error::{Error, Result};
pub use stream::{XzReader, XzWriter, decode, encode};
