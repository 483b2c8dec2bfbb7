// Encoder/decoder configuration and session construction.
//
// `EncoderConfig::open` is where the thread count is resolved: requests above
// the machine's available parallelism are clamped (with a warning), one
// resolved thread selects the single-threaded preset encoder and anything
// more selects the multi-threaded stream encoder.

use bitflags::bitflags;

use crate::engine::{Check, Engine, MtOptions};
use crate::error::{Error, Result, SessionKind};

/// Default compression level, matching `xz`.
pub const DEFAULT_LEVEL: u32 = 6;

/// Default staging buffer size for the compressing writer.
pub const DEFAULT_WRITER_BUFFER: usize = 256 * 1024;

/// Default staging buffer size for the decompressing reader.
pub const DEFAULT_READER_BUFFER: usize = 512 * 1024;

const PRESET_EXTREME: u32 = 0x8000_0000;

// ---------------------------------------------------------------------------
// Preset
// ---------------------------------------------------------------------------

/// Compression preset: level 0-9, optionally in extreme mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    level: u32,
    extreme: bool,
}

impl Preset {
    /// Validate `level` (0-9).
    pub fn new(level: u32) -> Result<Self> {
        if level > 9 {
            return Err(Error::invalid(format!(
                "preset level {level} is outside 0-9"
            )));
        }
        Ok(Self {
            level,
            extreme: false,
        })
    }

    /// The same level with the slower, slightly denser extreme variant.
    pub fn extreme(self) -> Self {
        Self {
            extreme: true,
            ..self
        }
    }

    pub fn level(self) -> u32 {
        self.level
    }

    pub fn is_extreme(self) -> bool {
        self.extreme
    }

    pub(crate) fn raw(self) -> u32 {
        if self.extreme {
            self.level | PRESET_EXTREME
        } else {
            self.level
        }
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            extreme: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Decoder flags
// ---------------------------------------------------------------------------

bitflags! {
    /// Flags for the auto-detecting decoder.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DecoderFlags: u32 {
        /// Decode concatenated `.xz` members as one stream.
        const CONCATENATED = 0x08;
        /// Skip integrity check verification.
        const IGNORE_CHECK = 0x10;
    }
}

impl Default for DecoderFlags {
    fn default() -> Self {
        Self::CONCATENATED
    }
}

// ---------------------------------------------------------------------------
// Thread resolution
// ---------------------------------------------------------------------------

/// Number of threads the machine can run in parallel (at least 1).
pub fn available_threads() -> u32 {
    std::thread::available_parallelism()
        .map(|n| u32::try_from(n.get()).unwrap_or(u32::MAX))
        .unwrap_or(1)
}

fn clamp_threads(requested: u32, available: u32) -> u32 {
    let available = available.max(1);
    if requested > available {
        log::warn!(
            "{requested} encoder threads requested but only {available} available; using {available}"
        );
        available
    } else {
        requested
    }
}

// ---------------------------------------------------------------------------
// EncoderConfig
// ---------------------------------------------------------------------------

/// Configuration for encoder sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Requested worker threads (>= 1). Clamped to the available parallelism.
    pub threads: u32,
    pub preset: Preset,
    pub check: Check,
    /// Multi-threaded block size in bytes; 0 lets the engine choose.
    pub block_size: u64,
    /// Capacity of each staging buffer used by `XzWriter`.
    pub buffer_size: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            preset: Preset::default(),
            check: Check::Crc64,
            block_size: 0,
            buffer_size: DEFAULT_WRITER_BUFFER,
        }
    }
}

impl EncoderConfig {
    /// Validated config for `threads` workers at compression `level`.
    pub fn new(threads: u32, level: u32) -> Result<Self> {
        if threads == 0 {
            return Err(Error::invalid("thread count must be at least 1"));
        }
        Ok(Self {
            threads,
            preset: Preset::new(level)?,
            ..Self::default()
        })
    }

    /// The thread count that will actually be used.
    pub fn resolved_threads(&self) -> Result<u32> {
        if self.threads == 0 {
            return Err(Error::invalid("thread count must be at least 1"));
        }
        Ok(clamp_threads(self.threads, available_threads()))
    }

    /// Create an encoder session on `engine`.
    pub fn open<E: Engine>(&self, engine: &E) -> Result<E::Session> {
        let threads = self.resolved_threads()?;
        if threads == 1 {
            log::debug!(
                "creating encoder: preset {}, check {:?}",
                self.preset.level(),
                self.check
            );
            engine
                .easy_encoder(self.preset, self.check)
                .map_err(|status| Error::Init {
                    kind: SessionKind::Encoder,
                    status,
                })
        } else {
            log::debug!(
                "creating multi-threaded encoder: {threads} threads, preset {}, check {:?}",
                self.preset.level(),
                self.check
            );
            let options = MtOptions {
                threads,
                preset: self.preset,
                check: self.check,
                block_size: self.block_size,
            };
            engine.mt_encoder(&options).map_err(|status| Error::Init {
                kind: SessionKind::MtEncoder,
                status,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// DecoderConfig
// ---------------------------------------------------------------------------

/// Configuration for decoder sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Decoder memory limit in bytes.
    pub memlimit: u64,
    /// `CONCATENATED` is always added when the session is created.
    pub flags: DecoderFlags,
    /// Capacity of each staging buffer used by `XzReader`.
    pub buffer_size: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            memlimit: u64::MAX,
            flags: DecoderFlags::CONCATENATED,
            buffer_size: DEFAULT_READER_BUFFER,
        }
    }
}

impl DecoderConfig {
    /// Create a decoder session on `engine`.
    pub fn open<E: Engine>(&self, engine: &E) -> Result<E::Session> {
        if self.memlimit == 0 {
            return Err(Error::invalid("decoder memory limit must be non-zero"));
        }
        let flags = self.flags | DecoderFlags::CONCATENATED;
        log::debug!("creating decoder: memlimit {}, flags {flags:?}", self.memlimit);
        engine
            .auto_decoder(self.memlimit, flags)
            .map_err(|status| Error::Init {
                kind: SessionKind::Decoder,
                status,
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
