use core::sync::atomic::{AtomicU64, Ordering};
use std::fs::OpenOptions;
use std::path::Path;
use std::time::Instant;

use memmap2::MmapRaw;

use crate::error::{FrameError, OpenError, PopTimeout, PushError};
use crate::frame;
use crate::spin::SpinPolicy;

pub(crate) const WORD_SIZE: usize = core::mem::size_of::<u64>();
const HEADER_SIZE: u64 = 3 * WORD_SIZE as u64;

/// High 8 bits of `state` count in-flight writers, low 56 bits are the
/// write-index. One unit of writer-count.
const MAGIC: u64 = 1 << (u64::BITS - 8);
/// Mask selecting the write-index bits of `state`.
const MASK: u64 = MAGIC - 1;

pub(crate) const TERMINATOR: u8 = 0xFF;
const SENTINEL: u8 = 0xFD;

/// Marks the on-disk layout as ours and records the word width it was
/// written under. Stored in the header word the source left reserved and
/// unconsulted: rather than leave it load-bearing by accident, every open
/// checks it.
const FORMAT_MAGIC: u64 = u64::from_le_bytes(*b"PAGELOG1");

/// Bytes of arena a fresh page carries if the caller does not request a
/// different size. Matches the source's own default of 4096 * 16000.
pub const DEFAULT_ARENA_SIZE: u64 = 4096 * 16_000;

#[repr(C)]
struct PageHeader {
    ready: AtomicU64,
    state: AtomicU64,
    safe_end: AtomicU64,
}

/// Layout parameters for a page's backing file.
#[derive(Clone, Copy, Debug)]
pub struct PageOptions {
    /// Bytes available to message bodies and their framing. All
    /// processes opening the same file must agree on this, the same way
    /// they must agree on word width and endianness; this crate does not
    /// persist it anywhere other people could diff it against.
    pub arena_size: u64,
}

impl Default for PageOptions {
    fn default() -> Self {
        PageOptions {
            arena_size: DEFAULT_ARENA_SIZE,
        }
    }
}

/// One fixed-size, memory-mapped file: three atomic header words followed
/// by a byte arena of self-delimited messages.
///
/// Push and pop never take a kernel lock; see the crate docs for the
/// reservation/commit protocol this type implements.
pub struct Page {
    map: MmapRaw,
    arena_size: u64,
}

/// Result of a successful or refused `push`.
#[derive(Debug)]
pub enum PushOutcome {
    /// The message was committed; the value is the total bytes consumed
    /// (body plus framing), i.e. how far the write-index advanced.
    Written(u64),
    /// The reservation did not fit. The page is now sealed (or already
    /// was); the caller should open the next page.
    Full,
}

/// Result of a `pop` at some cursor.
#[derive(Debug)]
pub enum PopOutcome<'a> {
    /// `data` is the message body; advance the cursor by `advance` bytes
    /// before the next `pop` on this page.
    Success { data: &'a [u8], advance: u64 },
    /// Nothing committed past the cursor yet. Retry later at the same
    /// cursor.
    Empty,
    /// The page is sealed at or before the cursor. Move to the next page
    /// at cursor `0`; do not advance within this one.
    Finished,
    /// A malformed frame: fatal to the caller's protocol, not retryable.
    Error(FrameError),
}

// Safety: all mutable state behind `map` is either atomic header words or
// byte ranges each writer owns exclusively between reservation and
// commit; no aliasing of live writer ranges is ever produced by this
// type.
unsafe impl Send for Page {}
unsafe impl Sync for Page {}

impl Page {
    /// Map the backing file at `path`, creating and sizing it if absent.
    ///
    /// Concurrent opens by multiple processes are safe as long as every
    /// process agrees on `options.arena_size`: the file is only ever sized
    /// once, by whichever process creates it, and a freshly zeroed file is
    /// already a valid empty page by construction. A process that opens an
    /// existing file with a different `arena_size` gets
    /// `OpenError::SizeMismatch` rather than having the file silently
    /// resized out from under the others.
    pub fn open(path: impl AsRef<Path>, options: PageOptions) -> Result<Self, OpenError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(OpenError::Open)?;

        let total = HEADER_SIZE + options.arena_size;
        let existing_len = file.metadata().map_err(OpenError::Truncate)?.len();

        if existing_len == 0 {
            file.set_len(total).map_err(OpenError::Truncate)?;
        } else if existing_len != total {
            return Err(OpenError::SizeMismatch {
                expected: total,
                found: existing_len,
            });
        }

        let map = MmapRaw::map_raw(&file).map_err(OpenError::Map)?;
        let page = Page {
            map,
            arena_size: options.arena_size,
        };

        page.check_or_claim_format()?;

        #[cfg(feature = "trace")]
        tracing::debug!(arena_size = options.arena_size, "page opened");

        Ok(page)
    }

    fn check_or_claim_format(&self) -> Result<(), OpenError> {
        let header = self.header();
        // A freshly zeroed file has `ready == 0`; claim it. Lose the race
        // gracefully: whoever wins, the value afterwards must be ours.
        let _ = header
            .ready
            .compare_exchange(0, FORMAT_MAGIC, Ordering::AcqRel, Ordering::Acquire);

        if header.ready.load(Ordering::Acquire) != FORMAT_MAGIC {
            return Err(OpenError::IncompatibleFormat);
        }

        Ok(())
    }

    /// Bytes available to message bodies and framing in this page.
    pub fn arena_size(&self) -> u64 {
        self.arena_size
    }

    /// Unmap the page. Equivalent to dropping it; provided so callers can
    /// make the lifecycle step explicit, matching the core's four-verb
    /// contract (open/push/pop/close).
    pub fn close(self) {
        drop(self)
    }

    /// Append one message. Never blocks.
    pub fn push(&self, bytes: &[u8]) -> Result<PushOutcome, PushError> {
        #[cfg(not(feature = "length-prefixed"))]
        if bytes.contains(&TERMINATOR) {
            return Err(PushError::PayloadContainsTerminator);
        }

        let body_len = bytes.len() as u64;
        let total_len = frame::total_len(body_len);

        if total_len > self.arena_size {
            return Err(PushError::PayloadTooLarge);
        }

        let header = self.header();
        let prior = header.state.fetch_add(MAGIC + total_len, Ordering::AcqRel);
        let start = prior & MASK;
        let end = start + total_len;

        // Leave one byte of headroom: if this reservation overflows, the
        // sentinel written below must itself still fit in the arena.
        if end > self.arena_size.saturating_sub(1) {
            header.state.fetch_sub(MAGIC, Ordering::Release);

            if start < self.arena_size {
                self.write_byte(start, SENTINEL);
                #[cfg(feature = "trace")]
                tracing::debug!(start, "page sealed");
            }

            return Ok(PushOutcome::Full);
        }

        frame::write_body(self, start, bytes);
        header.state.fetch_sub(MAGIC, Ordering::Release);

        Ok(PushOutcome::Written(total_len))
    }

    /// Read the message at `cursor`, spinning unboundedly (cooperatively
    /// yielding) if writers are in flight past `cursor`. Matches the
    /// source's behavior; see [`Page::pop_with`] for a bounded variant.
    pub fn pop(&self, cursor: u64) -> PopOutcome<'_> {
        self.pop_with(cursor, &SpinPolicy::unbounded())
            .unwrap_or(PopOutcome::Empty)
    }

    /// Read the message at `cursor` under a [`SpinPolicy`]. Returns
    /// `Err(PopTimeout)` if the policy's bound is hit before writer-count
    /// reaches zero.
    pub fn pop_with(&self, cursor: u64, spin: &SpinPolicy) -> Result<PopOutcome<'_>, PopTimeout> {
        let header = self.header();
        let mut end = header.safe_end.load(Ordering::Relaxed);

        if end <= cursor {
            end = self.spin_for_write_index(spin)?;
            header.safe_end.fetch_max(end, Ordering::Relaxed);
        }

        let end = end.min(self.arena_size);

        if end == cursor {
            return Ok(PopOutcome::Empty);
        }

        if self.read_byte(cursor) == SENTINEL {
            return Ok(PopOutcome::Finished);
        }

        match frame::read_message(self, cursor, end) {
            Ok((data, advance)) => Ok(PopOutcome::Success { data, advance }),
            Err(()) => {
                #[cfg(feature = "trace")]
                tracing::error!(cursor, end, "malformed message frame");
                Ok(PopOutcome::Error(FrameError))
            }
        }
    }

    /// Spin until writer-count is zero, returning the write-index at that
    /// instant. Bitwise-not, not logical-not, of `MASK` selects the
    /// writer-count bits (Rust's `!` on an integer has no other meaning).
    fn spin_for_write_index(&self, spin: &SpinPolicy) -> Result<u64, PopTimeout> {
        let header = self.header();
        let deadline = spin.deadline.map(|d| Instant::now() + d);
        let mut iters: u64 = 0;

        loop {
            let state = header.state.load(Ordering::Acquire);
            if state & !MASK == 0 {
                return Ok(state & MASK);
            }

            if let Some(max) = spin.max_spin_iters {
                iters += 1;
                if iters >= max {
                    return Err(PopTimeout);
                }
            }

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(PopTimeout);
                }
            }

            if spin.spin_yield {
                std::thread::yield_now();
            }
        }
    }

    fn header(&self) -> &PageHeader {
        // Safety: the map is sized to at least `HEADER_SIZE` bytes by
        // `open`, and `PageHeader` is three `AtomicU64`s with no padding.
        unsafe { &*(self.map.as_ptr() as *const PageHeader) }
    }

    fn arena_ptr(&self) -> *mut u8 {
        // Safety: `HEADER_SIZE` is within the mapped length (`open`
        // rejects shorter files via `set_len`/mmap failure).
        unsafe { self.map.as_mut_ptr().add(HEADER_SIZE as usize) }
    }

    /// Safety (caller, i.e. `frame.rs`): `offset..offset + data.len()`
    /// must be a byte range this writer exclusively owns between
    /// reservation and commit (invariant 3).
    pub(crate) fn write_bytes(&self, offset: u64, data: &[u8]) {
        unsafe {
            core::ptr::copy_nonoverlapping(
                data.as_ptr(),
                self.arena_ptr().add(offset as usize),
                data.len(),
            );
        }
    }

    pub(crate) fn write_byte(&self, offset: u64, byte: u8) {
        unsafe { self.arena_ptr().add(offset as usize).write(byte) }
    }

    pub(crate) fn read_byte(&self, offset: u64) -> u8 {
        unsafe { self.arena_ptr().add(offset as usize).read() }
    }

    /// Safety (caller): `[start, end)` must lie within a prefix already
    /// observed committed, i.e. at or before some write-index seen with
    /// writer-count zero (invariant 4). The returned slice's lifetime is
    /// tied to `&self`, not `'static`: it aliases the mmap and must not
    /// be read past this page being closed.
    pub(crate) fn arena_slice(&self, start: u64, end: u64) -> &[u8] {
        unsafe { core::slice::from_raw_parts(self.arena_ptr().add(start as usize), (end - start) as usize) }
    }
}
