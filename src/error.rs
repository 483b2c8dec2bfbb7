// Error taxonomy for the adapters.
//
// Every failure surfaces synchronously to the caller of the triggering
// write/read/close call. Nothing is retried internally: a non-OK,
// non-stream-end engine code halts the operation and leaves the adapter
// poisoned.

use std::io;

use crate::engine::Status;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Which engine constructor failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// Single-threaded preset encoder.
    Encoder,
    /// Multi-threaded stream encoder.
    MtEncoder,
    /// Format auto-detecting decoder.
    Decoder,
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encoder => f.write_str("encoder"),
            Self::MtEncoder => f.write_str("multi-threaded encoder"),
            Self::Decoder => f.write_str("decoder"),
        }
    }
}

/// Errors raised by sessions, adapters and the one-shot codec.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rejected before any engine call; fix the argument and retry.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The session constructor returned a non-OK status.
    #[error("cannot create {kind} session: {status}")]
    Init { kind: SessionKind, status: Status },

    /// A step returned neither OK nor stream end.
    #[error("codec step failed: {status}")]
    Engine { status: Status },

    /// A staging buffer could not be allocated.
    #[error("cannot allocate {requested} byte staging buffer")]
    OutOfMemory { requested: usize },

    /// The engine stopped consuming and producing bytes.
    #[error("codec made no progress for {steps} consecutive steps")]
    Stalled { steps: u32 },

    /// The adapter has already been closed.
    #[error("stream is closed")]
    Closed,

    /// An earlier fatal error left the adapter unusable.
    #[error("stream is unusable after an earlier failure")]
    Poisoned,

    /// Upstream source or destination sink failure.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// The engine status behind this error, if any.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Init { status, .. } | Self::Engine { status } => Some(*status),
            _ => None,
        }
    }

    fn io_kind(&self) -> io::ErrorKind {
        match self {
            Self::Io(e) => e.kind(),
            Self::InvalidArgument(_) => io::ErrorKind::InvalidInput,
            Self::OutOfMemory { .. } => io::ErrorKind::OutOfMemory,
            Self::Closed | Self::Poisoned => io::ErrorKind::BrokenPipe,
            Self::Init { status, .. } | Self::Engine { status } => match status {
                Status::MemError | Status::MemlimitError => io::ErrorKind::OutOfMemory,
                Status::FormatError | Status::DataError | Status::BufError => {
                    io::ErrorKind::InvalidData
                }
                Status::OptionsError | Status::UnsupportedCheck => io::ErrorKind::Unsupported,
                _ => io::ErrorKind::Other,
            },
            Self::Stalled { .. } => io::ErrorKind::Other,
        }
    }
}

/// Recovers an `Error` that crossed a `Read`/`Write` boundary.
impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.downcast::<Error>() {
            Ok(inner) => inner,
            Err(e) => Error::Io(e),
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(inner) => inner,
            other => io::Error::new(other.io_kind(), other),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
