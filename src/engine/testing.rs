// Scripted engine for driver tests.
//
// `StoreEngine` sessions copy input to output unchanged, at most `chunk`
// bytes per step, and report stream end once `Finish` is requested and all
// input has been copied. Behaviour knobs inject failures and stalls, and a
// shared `Counters` records how the adapters used the session.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Action, Check, Engine, MtOptions, Progress, Session, Status, Step};
use crate::config::{DecoderFlags, Preset};

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub created: AtomicUsize,
    pub released: AtomicUsize,
    pub steps: AtomicUsize,
    pub steps_after_end: AtomicUsize,
    pub flushes: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Behavior {
    Store,
    /// Return this status on step number `at` (0-based).
    FailAt { at: usize, status: Status },
    /// Stop consuming and producing after `after` steps.
    StallAfter { after: usize },
}

#[derive(Debug, Clone)]
pub(crate) struct StoreEngine {
    pub chunk: usize,
    pub behavior: Behavior,
    pub init_status: Status,
    pub counters: Arc<Counters>,
}

impl StoreEngine {
    pub fn new(chunk: usize) -> Self {
        Self {
            chunk,
            behavior: Behavior::Store,
            init_status: Status::Ok,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    fn open(&self) -> Result<StoreSession, Status> {
        if self.init_status != Status::Ok {
            return Err(self.init_status);
        }
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        Ok(StoreSession {
            chunk: self.chunk,
            behavior: self.behavior,
            counters: self.counters.clone(),
            steps: 0,
            ended: false,
            total_in: 0,
            total_out: 0,
        })
    }
}

impl Engine for StoreEngine {
    type Session = StoreSession;

    fn easy_encoder(&self, _preset: Preset, _check: Check) -> Result<StoreSession, Status> {
        self.open()
    }

    fn mt_encoder(&self, _options: &MtOptions) -> Result<StoreSession, Status> {
        self.open()
    }

    fn auto_decoder(&self, _memlimit: u64, _flags: DecoderFlags) -> Result<StoreSession, Status> {
        self.open()
    }
}

pub(crate) struct StoreSession {
    chunk: usize,
    behavior: Behavior,
    counters: Arc<Counters>,
    steps: usize,
    ended: bool,
    total_in: u64,
    total_out: u64,
}

impl Session for StoreSession {
    fn code(&mut self, input: &[u8], output: &mut [u8], action: Action) -> Step {
        let step_no = self.steps;
        self.steps += 1;
        self.counters.steps.fetch_add(1, Ordering::SeqCst);
        if self.ended {
            self.counters.steps_after_end.fetch_add(1, Ordering::SeqCst);
        }

        match self.behavior {
            Behavior::FailAt { at, status } if at == step_no => {
                return Step {
                    consumed: 0,
                    produced: 0,
                    status,
                };
            }
            Behavior::StallAfter { after } if step_no >= after => {
                return Step {
                    consumed: 0,
                    produced: 0,
                    status: Status::Ok,
                };
            }
            _ => {}
        }

        let n = input.len().min(output.len()).min(self.chunk);
        output[..n].copy_from_slice(&input[..n]);
        self.total_in += n as u64;
        self.total_out += n as u64;

        let drained = n == input.len();
        let status = match action {
            Action::Finish if drained => {
                self.ended = true;
                Status::StreamEnd
            }
            Action::FullFlush if drained => {
                self.counters.flushes.fetch_add(1, Ordering::SeqCst);
                Status::StreamEnd
            }
            _ => Status::Ok,
        };

        Step {
            consumed: n,
            produced: n,
            status,
        }
    }

    fn progress(&mut self) -> Progress {
        Progress {
            bytes_in: self.total_in,
            bytes_out: self.total_out,
        }
    }

    fn total_in(&self) -> u64 {
        self.total_in
    }

    fn total_out(&self) -> u64 {
        self.total_out
    }
}

impl Drop for StoreSession {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}
