//! Message framing: how a body becomes bytes in the arena, and back.
//!
//! Two variants, selected at compile time by the `length-prefixed`
//! feature. Both are expressed
//! against the same `Page` byte-access primitives so the reservation and
//! commit protocol in `page.rs` never needs to know which one is active.
use crate::page::{Page, TERMINATOR, WORD_SIZE};

/// Total arena bytes a message of `body_len` bytes consumes, including
/// framing overhead.
#[cfg(not(feature = "length-prefixed"))]
pub(crate) fn total_len(body_len: u64) -> u64 {
    body_len + 1
}

#[cfg(feature = "length-prefixed")]
pub(crate) fn total_len(body_len: u64) -> u64 {
    body_len + WORD_SIZE as u64 + 1
}

/// Write a reserved, exclusively-owned byte range `[start, start + total_len(bytes.len()))`.
#[cfg(not(feature = "length-prefixed"))]
pub(crate) fn write_body(page: &Page, start: u64, bytes: &[u8]) {
    page.write_bytes(start, bytes);
    page.write_byte(start + bytes.len() as u64, TERMINATOR);
}

#[cfg(feature = "length-prefixed")]
pub(crate) fn write_body(page: &Page, start: u64, bytes: &[u8]) {
    page.write_bytes(start, &(bytes.len() as u64).to_le_bytes());
    let body_start = start + WORD_SIZE as u64;
    page.write_bytes(body_start, bytes);
    page.write_byte(body_start + bytes.len() as u64, TERMINATOR);
}

/// Read the message starting at `cursor`, where `end` is the already
/// established safe read horizon (`cursor < end`). Returns the body slice
/// and the number of bytes the caller's cursor should advance by.
///
/// `Err(())` means a malformed frame: scanned to `end` without finding a
/// terminator (default framing), or the byte after the declared length
/// was not the terminator (length-prefixed framing). The caller turns
/// this into [`crate::FrameError`].
#[cfg(not(feature = "length-prefixed"))]
pub(crate) fn read_message(page: &Page, cursor: u64, end: u64) -> Result<(&[u8], u64), ()> {
    let mut i = cursor;
    while i < end {
        if page.read_byte(i) == TERMINATOR {
            let body = page.arena_slice(cursor, i);
            return Ok((body, i - cursor + 1));
        }
        i += 1;
    }
    Err(())
}

#[cfg(feature = "length-prefixed")]
pub(crate) fn read_message(page: &Page, cursor: u64, end: u64) -> Result<(&[u8], u64), ()> {
    let word = WORD_SIZE as u64;
    if cursor + word > end {
        return Err(());
    }

    let len_bytes = page.arena_slice(cursor, cursor + word);
    let len = u64::from_le_bytes(len_bytes.try_into().map_err(|_| ())?);

    let body_start = cursor + word;
    let body_end = body_start.checked_add(len).ok_or(())?;
    let terminator_at = body_end;

    if terminator_at >= end || page.read_byte(terminator_at) != TERMINATOR {
        return Err(());
    }

    Ok((page.arena_slice(body_start, body_end), terminator_at - cursor + 1))
}
