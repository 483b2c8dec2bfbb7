// Codec engine boundary.
//
// The adapters never talk to liblzma directly. They receive an `Engine`
// capability that constructs sessions, and drive each `Session` one step at a
// time through `Session::code`. The only implementation shipped with the
// crate is `liblzma::Liblzma`, backed by `lzma-sys`; tests inject their own.
//
//   - `Engine`: session constructors (easy encoder, MT encoder, auto decoder)
//   - `Session`: one opaque codec handle with step and counter queries
//   - `Status`: engine status codes, success or fatal

pub mod liblzma;

#[cfg(test)]
pub(crate) mod testing;

use crate::config::{DecoderFlags, Preset};

pub use liblzma::{Liblzma, LzmaSession};

// ---------------------------------------------------------------------------
// Action / Status / Check
// ---------------------------------------------------------------------------

/// Mode attached to every engine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// More input may follow.
    Run,
    /// Emit everything buffered so far as a decodable unit, then resume `Run`.
    FullFlush,
    /// The input is exhausted; complete the stream.
    Finish,
}

/// Status code reported by a session constructor or step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    StreamEnd,
    NoCheck,
    UnsupportedCheck,
    GetCheck,
    MemError,
    MemlimitError,
    FormatError,
    OptionsError,
    DataError,
    BufError,
    ProgError,
    /// A code this crate does not know about.
    Unknown(u32),
}

impl Status {
    /// `Ok` and `StreamEnd` are the only codes that let a session continue.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Ok | Self::StreamEnd)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => f.write_str("operation completed successfully"),
            Self::StreamEnd => f.write_str("end of stream was reached"),
            Self::NoCheck => f.write_str("input stream has no integrity check"),
            Self::UnsupportedCheck => f.write_str("cannot calculate the integrity check"),
            Self::GetCheck => f.write_str("integrity check type is now available"),
            Self::MemError => f.write_str("cannot allocate memory"),
            Self::MemlimitError => f.write_str("memory usage limit was reached"),
            Self::FormatError => f.write_str("file format not recognized"),
            Self::OptionsError => f.write_str("invalid or unsupported options"),
            Self::DataError => f.write_str("data is corrupt"),
            Self::BufError => f.write_str("no progress is possible (truncated input?)"),
            Self::ProgError => f.write_str("programming error"),
            Self::Unknown(code) => write!(f, "unknown status code {code}"),
        }
    }
}

/// Integrity check recorded in the stream trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Check {
    None,
    Crc32,
    #[default]
    Crc64,
    Sha256,
}

// ---------------------------------------------------------------------------
// Step / Progress
// ---------------------------------------------------------------------------

/// Outcome of a single `Session::code` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Bytes taken from the front of the input slice.
    pub consumed: usize,
    /// Bytes written to the front of the output slice.
    pub produced: usize,
    pub status: Status,
}

/// Engine-side progress counters.
///
/// For the multi-threaded encoder these lag `total_in`/`total_out`, because
/// input handed to worker threads is only counted once it has been encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub bytes_in: u64,
    pub bytes_out: u64,
}

/// Options for the multi-threaded encoder constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MtOptions {
    pub threads: u32,
    pub preset: Preset,
    pub check: Check,
    /// Uncompressed block size; 0 lets the engine pick.
    pub block_size: u64,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// One codec handle.
///
/// Dropping the session releases the engine state; that happens exactly once
/// because ownership is never shared.
pub trait Session: Send {
    /// Run one engine step over `input` and `output` with `action`.
    ///
    /// The session never retains either slice past the call.
    fn code(&mut self, input: &[u8], output: &mut [u8], action: Action) -> Step;

    /// Query the engine's progress counters.
    fn progress(&mut self) -> Progress;

    /// Total bytes consumed over the session's lifetime.
    fn total_in(&self) -> u64;

    /// Total bytes produced over the session's lifetime.
    fn total_out(&self) -> u64;
}

/// A set of callable engine constructors.
pub trait Engine {
    type Session: Session;

    /// Single-threaded encoder for `preset` with integrity check `check`.
    fn easy_encoder(&self, preset: Preset, check: Check) -> Result<Self::Session, Status>;

    /// Multi-threaded stream encoder.
    fn mt_encoder(&self, options: &MtOptions) -> Result<Self::Session, Status>;

    /// Decoder that detects `.xz` and legacy `.lzma` input.
    fn auto_decoder(&self, memlimit: u64, flags: DecoderFlags)
    -> Result<Self::Session, Status>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
