// Decompressing reader.
//
// `XzReader` pulls compressed bytes from the upstream source in stage-sized
// fills and hands decompressed bytes to the caller. The decoder always runs
// with `CONCATENATED`, so back-to-back `.xz` members read as one stream.

use std::io::{self, Read};

use super::driver::{Driver, Phase, Totals};
use crate::config::DecoderConfig;
use crate::engine::{Engine, Liblzma, LzmaSession, Progress, Session};
use crate::error::{Error, Result};

enum State<S> {
    Open(Driver<S>),
    Closed(Totals),
    Poisoned(Totals),
}

/// An `.xz` / `.lzma` decompressor wrapping a [`Read`] source.
pub struct XzReader<R: Read, S: Session = LzmaSession> {
    source: R,
    state: State<S>,
}

impl<R: Read> XzReader<R> {
    pub fn new(source: R) -> Result<Self> {
        Self::with_config(source, &DecoderConfig::default())
    }

    pub fn with_config(source: R, config: &DecoderConfig) -> Result<Self> {
        Self::with_engine(source, &Liblzma, config)
    }
}

impl<R: Read, S: Session> XzReader<R, S> {
    /// Create a reader whose session comes from `engine`.
    pub fn with_engine<E>(source: R, engine: &E, config: &DecoderConfig) -> Result<Self>
    where
        E: Engine<Session = S>,
    {
        if config.buffer_size == 0 {
            return Err(Error::invalid("reader buffer size must be non-zero"));
        }
        let session = config.open(engine)?;
        let driver = Driver::new(session, config.buffer_size, config.buffer_size)?;
        Ok(Self {
            source,
            state: State::Open(driver),
        })
    }

    pub fn get_ref(&self) -> &R {
        &self.source
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.source
    }

    /// Release the session and return the upstream source.
    pub fn into_inner(self) -> R {
        self.source
    }

    pub fn progress(&mut self) -> Progress {
        match &mut self.state {
            State::Open(driver) => driver.progress(),
            State::Closed(totals) | State::Poisoned(totals) => (*totals).into(),
        }
    }

    /// Compressed bytes consumed by the engine.
    pub fn total_in(&self) -> u64 {
        self.totals().total_in
    }

    /// Decompressed bytes produced by the engine.
    pub fn total_out(&self) -> u64 {
        self.totals().total_out
    }

    fn totals(&self) -> Totals {
        match &self.state {
            State::Open(driver) => driver.totals(),
            State::Closed(totals) | State::Poisoned(totals) => *totals,
        }
    }

    /// Release the session and buffers. Calling it again is a no-op.
    pub fn close(&mut self) {
        if let State::Open(driver) = &self.state {
            let totals = driver.totals();
            self.state = State::Closed(totals);
        }
    }

    fn try_read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let driver = match &mut self.state {
            State::Open(driver) => driver,
            State::Closed(_) => return Err(Error::Closed),
            State::Poisoned(_) => return Err(Error::Poisoned),
        };
        let result = fill(driver, &mut self.source, buf);
        if result.is_err() {
            let totals = self.totals();
            self.state = State::Poisoned(totals);
        }
        result
    }
}

fn fill<R: Read, S: Session>(
    driver: &mut Driver<S>,
    source: &mut R,
    buf: &mut [u8],
) -> Result<usize> {
    let mut written = 0;
    loop {
        written += driver.output.copy_to(&mut buf[written..]);
        if written == buf.len() {
            return Ok(written);
        }
        driver.output.reclaim();

        match driver.phase() {
            Phase::Done => return Ok(written),
            Phase::Draining => {}
            Phase::AwaitingInput => {
                driver.stage_from(source)?;
                if driver.staged() == 0 {
                    log::debug!("empty upstream; treating as an empty stream");
                    driver.end_empty();
                }
            }
            Phase::Stepping | Phase::Flushing | Phase::Finishing => driver.step()?,
        }
    }
}

impl<R: Read, S: Session> Read for XzReader<R, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.try_read(buf)?)
    }
}

impl<R: Read + std::fmt::Debug, S: Session> std::fmt::Debug for XzReader<R, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            State::Open(_) => "open",
            State::Closed(_) => "closed",
            State::Poisoned(_) => "poisoned",
        };
        f.debug_struct("XzReader")
            .field("source", &self.source)
            .field("state", &state)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
