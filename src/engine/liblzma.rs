// liblzma engine, backed by `lzma-sys`.
//
// This is the only module that touches the raw `lzma_stream` record. The
// cursor fields are pointed at the caller's slices for the duration of one
// `lzma_code` call and cleared again before returning, so no pointer into an
// adapter buffer outlives the step that used it.

use std::ffi::CStr;
use std::{mem, ptr};

use lzma_sys as sys;

use super::{Action, Check, Engine, MtOptions, Progress, Session, Status, Step};
use crate::config::{DecoderFlags, Preset};

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The process-wide liblzma engine.
///
/// Linking and symbol resolution are handled by `lzma-sys`, so this is a
/// zero-sized capability that can be copied freely.
#[derive(Debug, Clone, Copy, Default)]
pub struct Liblzma;

impl Liblzma {
    /// Version string of the linked liblzma, e.g. `"5.2.5"`.
    pub fn version() -> String {
        // SAFETY: liblzma returns a pointer to a static NUL-terminated string.
        unsafe { CStr::from_ptr(sys::lzma_version_string()) }
            .to_string_lossy()
            .into_owned()
    }
}

impl Engine for Liblzma {
    type Session = LzmaSession;

    fn easy_encoder(&self, preset: Preset, check: Check) -> Result<LzmaSession, Status> {
        LzmaSession::init(|raw| unsafe {
            sys::lzma_easy_encoder(raw, preset.raw(), raw_check(check))
        })
    }

    fn mt_encoder(&self, options: &MtOptions) -> Result<LzmaSession, Status> {
        // Reserved fields stay zero; only the documented ones are set.
        // SAFETY: `lzma_mt` is a plain C struct for which all-zero is valid.
        let mut mt: sys::lzma_mt = unsafe { mem::zeroed() };
        mt.flags = 0;
        mt.threads = options.threads;
        mt.block_size = options.block_size;
        mt.timeout = 0;
        mt.preset = options.preset.raw();
        mt.filters = ptr::null();
        mt.check = raw_check(options.check);

        LzmaSession::init(|raw| unsafe { sys::lzma_stream_encoder_mt(raw, &mt) })
    }

    fn auto_decoder(&self, memlimit: u64, flags: DecoderFlags) -> Result<LzmaSession, Status> {
        LzmaSession::init(|raw| unsafe { sys::lzma_auto_decoder(raw, memlimit, flags.bits()) })
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// An initialized `lzma_stream`. `lzma_end` runs on drop.
pub struct LzmaSession {
    raw: sys::lzma_stream,
}

// SAFETY: the stream's internal state is heap-allocated by liblzma and not
// bound to the creating thread; the cursor pointers are null between steps.
unsafe impl Send for LzmaSession {}

impl LzmaSession {
    fn init(f: impl FnOnce(*mut sys::lzma_stream) -> sys::lzma_ret) -> Result<Self, Status> {
        // SAFETY: an all-zero `lzma_stream` is LZMA_STREAM_INIT.
        let mut session = LzmaSession {
            raw: unsafe { mem::zeroed() },
        };
        match status_from_raw(f(&mut session.raw)) {
            Status::Ok => Ok(session),
            // Dropping `session` frees anything a failed init left behind.
            status => Err(status),
        }
    }
}

impl Session for LzmaSession {
    fn code(&mut self, input: &[u8], output: &mut [u8], action: Action) -> Step {
        self.raw.next_in = input.as_ptr();
        self.raw.avail_in = input.len();
        self.raw.next_out = output.as_mut_ptr();
        self.raw.avail_out = output.len();

        // SAFETY: the cursors describe live slices borrowed for this call only.
        let ret = unsafe { sys::lzma_code(&mut self.raw, raw_action(action)) };

        let consumed = input.len() - self.raw.avail_in;
        let produced = output.len() - self.raw.avail_out;

        self.raw.next_in = ptr::null();
        self.raw.avail_in = 0;
        self.raw.next_out = ptr::null_mut();
        self.raw.avail_out = 0;

        Step {
            consumed,
            produced,
            status: status_from_raw(ret),
        }
    }

    fn progress(&mut self) -> Progress {
        let mut progress = Progress::default();
        // SAFETY: `raw` is initialized and both out-pointers are valid.
        unsafe {
            sys::lzma_get_progress(
                &mut self.raw,
                &mut progress.bytes_in,
                &mut progress.bytes_out,
            );
        }
        progress
    }

    fn total_in(&self) -> u64 {
        self.raw.total_in
    }

    fn total_out(&self) -> u64 {
        self.raw.total_out
    }
}

impl Drop for LzmaSession {
    fn drop(&mut self) {
        // SAFETY: `raw` was zero-initialized and only ever passed to liblzma.
        unsafe { sys::lzma_end(&mut self.raw) }
    }
}

// ---------------------------------------------------------------------------
// Raw code conversion
// ---------------------------------------------------------------------------

fn raw_action(action: Action) -> sys::lzma_action {
    match action {
        Action::Run => sys::LZMA_RUN,
        Action::FullFlush => sys::LZMA_FULL_FLUSH,
        Action::Finish => sys::LZMA_FINISH,
    }
}

fn raw_check(check: Check) -> sys::lzma_check {
    match check {
        Check::None => sys::LZMA_CHECK_NONE,
        Check::Crc32 => sys::LZMA_CHECK_CRC32,
        Check::Crc64 => sys::LZMA_CHECK_CRC64,
        Check::Sha256 => sys::LZMA_CHECK_SHA256,
    }
}

fn status_from_raw(ret: sys::lzma_ret) -> Status {
    match ret {
        sys::LZMA_OK => Status::Ok,
        sys::LZMA_STREAM_END => Status::StreamEnd,
        sys::LZMA_NO_CHECK => Status::NoCheck,
        sys::LZMA_UNSUPPORTED_CHECK => Status::UnsupportedCheck,
        sys::LZMA_GET_CHECK => Status::GetCheck,
        sys::LZMA_MEM_ERROR => Status::MemError,
        sys::LZMA_MEMLIMIT_ERROR => Status::MemlimitError,
        sys::LZMA_FORMAT_ERROR => Status::FormatError,
        sys::LZMA_OPTIONS_ERROR => Status::OptionsError,
        sys::LZMA_DATA_ERROR => Status::DataError,
        sys::LZMA_BUF_ERROR => Status::BufError,
        sys::LZMA_PROG_ERROR => Status::ProgError,
        other => Status::Unknown(other as u32),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
