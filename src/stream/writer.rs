// Compressing writer.
//
// Bytes written to `XzWriter` are staged, compressed and forwarded to the
// wrapped sink whenever the output stage fills. Compressed output lags the
// input; only `full_flush` and `try_finish` guarantee the sink has seen
// everything written so far.

use std::io::{self, Write};
use std::{mem, ptr};

use super::driver::{Driver, Phase, Totals};
use crate::config::EncoderConfig;
use crate::engine::{Engine, Liblzma, LzmaSession, Progress, Session};
use crate::error::{Error, Result};

enum State<S> {
    Open(Driver<S>),
    Closed(Totals),
    Poisoned(Totals),
}

/// An `.xz` compressor wrapping a [`Write`] sink.
///
/// The writer must be closed with [`try_finish`](Self::try_finish),
/// [`close`](Self::close) or [`finish`](Self::finish) to emit the stream
/// trailer. Dropping an open writer finishes it on a best-effort basis and
/// only logs a failure.
///
/// ```no_run
/// use std::io::Write;
/// use xzstream::XzWriter;
///
/// let mut w = XzWriter::new(Vec::new())?;
/// w.write_all(b"hello")?;
/// let packed = w.finish()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct XzWriter<W: Write, S: Session = LzmaSession> {
    sink: W,
    state: State<S>,
}

impl<W: Write> XzWriter<W> {
    /// Preset 6, one thread, CRC64.
    pub fn new(sink: W) -> Result<Self> {
        Self::with_config(sink, &EncoderConfig::default())
    }

    pub fn with_config(sink: W, config: &EncoderConfig) -> Result<Self> {
        Self::with_engine(sink, &Liblzma, config)
    }
}

impl<W: Write, S: Session> XzWriter<W, S> {
    /// Create a writer whose session comes from `engine`.
    pub fn with_engine<E>(sink: W, engine: &E, config: &EncoderConfig) -> Result<Self>
    where
        E: Engine<Session = S>,
    {
        if config.buffer_size == 0 {
            return Err(Error::invalid("writer buffer size must be non-zero"));
        }
        let session = config.open(engine)?;
        let driver = Driver::new(session, config.buffer_size, config.buffer_size)?;
        Ok(Self {
            sink,
            state: State::Open(driver),
        })
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Writing to the sink directly corrupts the compressed stream.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    /// Engine progress; the final totals once closed.
    pub fn progress(&mut self) -> Progress {
        match &mut self.state {
            State::Open(driver) => driver.progress(),
            State::Closed(totals) | State::Poisoned(totals) => (*totals).into(),
        }
    }

    /// Uncompressed bytes consumed by the engine.
    pub fn total_in(&self) -> u64 {
        self.totals().total_in
    }

    /// Compressed bytes produced by the engine.
    pub fn total_out(&self) -> u64 {
        self.totals().total_out
    }

    fn totals(&self) -> Totals {
        match &self.state {
            State::Open(driver) => driver.totals(),
            State::Closed(totals) | State::Poisoned(totals) => *totals,
        }
    }

    /// Run `f` on the open driver. Any error poisons the writer and releases
    /// the session.
    fn with_driver<T>(&mut self, f: impl FnOnce(&mut Driver<S>, &mut W) -> Result<T>) -> Result<T> {
        let driver = match &mut self.state {
            State::Open(driver) => driver,
            State::Closed(_) => return Err(Error::Closed),
            State::Poisoned(_) => return Err(Error::Poisoned),
        };
        let result = f(driver, &mut self.sink);
        if result.is_err() {
            let totals = self.totals();
            self.state = State::Poisoned(totals);
        }
        result
    }

    fn write_staged(&mut self, buf: &[u8]) -> Result<()> {
        self.with_driver(|driver, sink| {
            let mut rest = buf;
            loop {
                match driver.phase() {
                    Phase::Draining => drain(driver, sink)?,
                    Phase::AwaitingInput if rest.is_empty() => return Ok(()),
                    Phase::AwaitingInput => {
                        let n = driver.stage(rest);
                        rest = &rest[n..];
                    }
                    Phase::Stepping | Phase::Flushing => driver.step()?,
                    Phase::Finishing | Phase::Done => return Err(Error::Closed),
                }
            }
        })
    }

    /// Make every byte written so far decodable from the sink.
    ///
    /// Ends the current block, which costs some compression ratio; plain
    /// [`Write::flush`] does not.
    pub fn full_flush(&mut self) -> Result<()> {
        self.with_driver(|driver, sink| {
            driver.begin_flush();
            loop {
                match driver.phase() {
                    Phase::Draining => drain(driver, sink)?,
                    Phase::Flushing | Phase::Stepping => driver.step()?,
                    Phase::AwaitingInput => break,
                    Phase::Finishing | Phase::Done => return Err(Error::Closed),
                }
            }
            drain(driver, sink)?;
            sink.flush()?;
            Ok(())
        })
    }

    /// Complete the stream: emit the trailer, flush the sink and release the
    /// session. Calling it again is a no-op.
    pub fn try_finish(&mut self) -> Result<()> {
        if let State::Closed(_) = self.state {
            return Ok(());
        }
        let totals = self.with_driver(|driver, sink| {
            driver.finish_input();
            loop {
                match driver.phase() {
                    Phase::Done => break,
                    Phase::Draining => drain(driver, sink)?,
                    _ => driver.step()?,
                }
            }
            sink.flush()?;
            Ok(driver.totals())
        })?;
        self.state = State::Closed(totals);
        Ok(())
    }

    /// Same as [`try_finish`](Self::try_finish).
    pub fn close(&mut self) -> Result<()> {
        self.try_finish()
    }

    /// Finish the stream and hand back the sink.
    pub fn finish(mut self) -> Result<W> {
        self.try_finish()?;
        let this = mem::ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so each field is moved out once.
        let (sink, state) = unsafe { (ptr::read(&this.sink), ptr::read(&this.state)) };
        drop(state);
        Ok(sink)
    }
}

fn drain<S: Session, W: Write>(driver: &mut Driver<S>, sink: &mut W) -> Result<()> {
    if driver.output.has_unread() {
        sink.write_all(driver.output.unread())?;
    }
    driver.output.clear();
    Ok(())
}

impl<W: Write, S: Session> Write for XzWriter<W, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.write_staged(buf)?;
        Ok(buf.len())
    }

    /// Forward already-compressed bytes and flush the sink. The engine keeps
    /// buffering, so the output matches an unflushed run.
    fn flush(&mut self) -> io::Result<()> {
        self.with_driver(|driver, sink| {
            drain(driver, sink)?;
            sink.flush()?;
            Ok(())
        })?;
        Ok(())
    }
}

impl<W: Write, S: Session> Drop for XzWriter<W, S> {
    fn drop(&mut self) {
        if let State::Open(_) = self.state
            && let Err(e) = self.try_finish()
        {
            log::warn!("failed to finish xz stream on drop: {e}");
        }
    }
}

impl<W: Write + std::fmt::Debug, S: Session> std::fmt::Debug for XzWriter<W, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            State::Open(_) => "open",
            State::Closed(_) => "closed",
            State::Poisoned(_) => "poisoned",
        };
        f.debug_struct("XzWriter")
            .field("sink", &self.sink)
            .field("state", &state)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
