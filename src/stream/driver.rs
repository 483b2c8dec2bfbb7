// Codec driver: the buffer-fill/drain state machine shared by the writer,
// the reader and the one-shot codec.
//
// The driver owns the session and both staging buffers. Callers ask for the
// current `Phase` and react to it: refill input, drain output, or step the
// engine. Every step is checked for forward progress so a stalled engine
// surfaces as `Error::Stalled` instead of an endless loop.

use std::io::{self, Read};

use crate::engine::{Action, Progress, Session, Status};
use crate::error::{Error, Result};

/// Consecutive no-progress steps tolerated before the driver gives up.
const STALL_LIMIT: u32 = 2;

// ---------------------------------------------------------------------------
// Staging buffers
// ---------------------------------------------------------------------------

fn alloc_buffer(capacity: usize) -> Result<Box<[u8]>> {
    if capacity == 0 {
        return Err(Error::invalid("staging buffer size must be non-zero"));
    }
    let mut buf = Vec::new();
    buf.try_reserve_exact(capacity)
        .map_err(|_| Error::OutOfMemory {
            requested: capacity,
        })?;
    buf.resize(capacity, 0);
    Ok(buf.into_boxed_slice())
}

/// Pending, not yet consumed input: `buf[pos..len]`.
pub(crate) struct InputStage {
    buf: Box<[u8]>,
    pos: usize,
    len: usize,
}

impl InputStage {
    fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            buf: alloc_buffer(capacity)?,
            pos: 0,
            len: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn pending(&self) -> &[u8] {
        &self.buf[self.pos..self.len]
    }

    pub fn is_empty(&self) -> bool {
        self.pos == self.len
    }

    fn consume(&mut self, n: usize) {
        self.pos += n;
        debug_assert!(self.pos <= self.len);
        if self.pos == self.len {
            self.pos = 0;
            self.len = 0;
        }
    }

    fn fill_from_slice(&mut self, src: &[u8]) -> usize {
        debug_assert!(self.is_empty());
        let n = src.len().min(self.buf.len());
        self.buf[..n].copy_from_slice(&src[..n]);
        self.pos = 0;
        self.len = n;
        n
    }

    // Reads until the stage is full or the source reports end of data, so a
    // short fill always means the source is exhausted.
    fn fill_from_reader<R: Read>(&mut self, reader: &mut R) -> io::Result<usize> {
        debug_assert!(self.is_empty());
        self.pos = 0;
        self.len = 0;
        while self.len < self.buf.len() {
            match reader.read(&mut self.buf[self.len..]) {
                Ok(0) => break,
                Ok(n) => self.len += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(self.len)
    }
}

/// Produced output: `buf[..filled]`, of which `buf[..read]` was delivered.
pub(crate) struct OutputStage {
    buf: Box<[u8]>,
    filled: usize,
    read: usize,
}

impl OutputStage {
    fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            buf: alloc_buffer(capacity)?,
            filled: 0,
            read: 0,
        })
    }

    pub fn is_full(&self) -> bool {
        self.filled == self.buf.len()
    }

    pub fn has_unread(&self) -> bool {
        self.read < self.filled
    }

    /// Produced bytes not yet delivered.
    pub fn unread(&self) -> &[u8] {
        &self.buf[self.read..self.filled]
    }

    /// Copy as much unread output as fits into `dst`, advancing the read cursor.
    pub fn copy_to(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.filled - self.read);
        dst[..n].copy_from_slice(&self.buf[self.read..self.read + n]);
        self.read += n;
        n
    }

    /// Reset to empty once everything produced has been delivered.
    pub fn reclaim(&mut self) {
        if self.read == self.filled {
            self.filled = 0;
            self.read = 0;
        }
    }

    /// Discard all produced bytes; callers must have copied them out first.
    pub fn clear(&mut self) {
        self.filled = 0;
        self.read = 0;
    }

    fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.filled..]
    }

    fn produce(&mut self, n: usize) {
        self.filled += n;
        debug_assert!(self.filled <= self.buf.len());
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Final byte counters, kept after the session is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Totals {
    pub total_in: u64,
    pub total_out: u64,
}

impl From<Totals> for Progress {
    fn from(t: Totals) -> Self {
        Progress {
            bytes_in: t.total_in,
            bytes_out: t.total_out,
        }
    }
}

/// What the caller of the driver has to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Input stage is empty and more input may arrive.
    AwaitingInput,
    /// Input is pending; step in `Run`.
    Stepping,
    /// Output is full, or the stream ended with output still buffered.
    Draining,
    /// A full flush is in progress; step in `FullFlush`.
    Flushing,
    /// Input is exhausted; step in `Finish` until stream end.
    Finishing,
    /// Stream ended and all output was drained.
    Done,
}

pub(crate) struct Driver<S> {
    session: S,
    pub input: InputStage,
    pub output: OutputStage,
    action: Action,
    terminal: bool,
    idle_steps: u32,
    staged: u64,
}

impl<S: Session> Driver<S> {
    pub fn new(session: S, input_capacity: usize, output_capacity: usize) -> Result<Self> {
        Ok(Self {
            session,
            input: InputStage::new(input_capacity)?,
            output: OutputStage::new(output_capacity)?,
            action: Action::Run,
            terminal: false,
            idle_steps: 0,
            staged: 0,
        })
    }

    pub fn phase(&self) -> Phase {
        if self.output.is_full() || (self.terminal && self.output.has_unread()) {
            return Phase::Draining;
        }
        if self.terminal {
            return Phase::Done;
        }
        match self.action {
            Action::Finish => Phase::Finishing,
            Action::FullFlush => Phase::Flushing,
            Action::Run if self.input.is_empty() => Phase::AwaitingInput,
            Action::Run => Phase::Stepping,
        }
    }

    #[cfg(test)]
    fn action(&self) -> Action {
        self.action
    }

    #[cfg(test)]
    fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Total bytes handed to the input stage.
    pub fn staged(&self) -> u64 {
        self.staged
    }

    /// Stage the front of `src`; returns how many bytes were taken.
    pub fn stage(&mut self, src: &[u8]) -> usize {
        debug_assert_eq!(self.action, Action::Run);
        let n = self.input.fill_from_slice(src);
        self.staged += n as u64;
        n
    }

    /// Refill the input stage from `reader`. A short fill switches to `Finish`.
    pub fn stage_from<R: Read>(&mut self, reader: &mut R) -> io::Result<usize> {
        debug_assert_eq!(self.action, Action::Run);
        let n = self.input.fill_from_reader(reader)?;
        self.staged += n as u64;
        if n < self.input.capacity() {
            self.finish_input();
        }
        Ok(n)
    }

    /// No more input will arrive. Irreversible.
    pub fn finish_input(&mut self) {
        self.action = Action::Finish;
    }

    /// End a stream that never received a single input byte, without
    /// stepping the engine.
    pub fn end_empty(&mut self) {
        debug_assert_eq!(self.staged, 0);
        self.action = Action::Finish;
        self.terminal = true;
    }

    /// Start a full flush; the driver returns to `Run` once it completes.
    pub fn begin_flush(&mut self) {
        if self.action == Action::Run {
            self.action = Action::FullFlush;
        }
    }

    /// Run one engine step with the current action.
    pub fn step(&mut self) -> Result<()> {
        debug_assert!(!self.terminal, "engine stepped after stream end");
        debug_assert!(!self.output.is_full(), "engine stepped with no output space");

        let action = self.action;
        let step = self
            .session
            .code(self.input.pending(), self.output.spare_mut(), action);
        self.input.consume(step.consumed);
        self.output.produce(step.produced);

        log::trace!(
            "{action:?}: consumed {}, produced {}, {:?}",
            step.consumed,
            step.produced,
            step.status
        );

        match step.status {
            Status::Ok => {}
            Status::StreamEnd if action == Action::FullFlush => self.action = Action::Run,
            Status::StreamEnd => {
                self.terminal = true;
                log::debug!(
                    "stream end: {} bytes in, {} bytes out",
                    self.session.total_in(),
                    self.session.total_out()
                );
            }
            status => return Err(Error::Engine { status }),
        }

        let progressed =
            step.consumed > 0 || step.produced > 0 || step.status == Status::StreamEnd;
        if progressed {
            self.idle_steps = 0;
        } else {
            self.idle_steps += 1;
            if self.idle_steps >= STALL_LIMIT {
                return Err(Error::Stalled {
                    steps: self.idle_steps,
                });
            }
        }
        Ok(())
    }

    pub fn progress(&mut self) -> Progress {
        self.session.progress()
    }

    pub fn totals(&self) -> Totals {
        Totals {
            total_in: self.session.total_in(),
            total_out: self.session.total_out(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
