use core::fmt;

/// Failure to create or map a page's backing file.
///
/// This is the only class of error this crate cannot recover from on its
/// own (mmap/ftruncate failures are fatal at startup). It is still
/// returned rather than aborting the process, since the caller decides
/// whether that is the right response.
#[derive(Debug)]
pub enum OpenError {
    Open(std::io::Error),
    Truncate(std::io::Error),
    Map(std::io::Error),
    /// The file already carries a format/word-width magic that does not
    /// match this build's. A page written by a 32-bit process, or a
    /// different on-disk layout, must never be opened as if it agreed.
    IncompatibleFormat,
    /// An existing, non-empty backing file's length does not match
    /// `HEADER_SIZE + arena_size`. Every process touching a page must
    /// agree on `arena_size`; resizing someone else's page out from under
    /// them would truncate or zero-extend committed data.
    SizeMismatch { expected: u64, found: u64 },
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenError::Open(err) => write!(f, "failed to open backing file: {err}"),
            OpenError::Truncate(err) => write!(f, "failed to size backing file: {err}"),
            OpenError::Map(err) => write!(f, "failed to map backing file: {err}"),
            OpenError::IncompatibleFormat => {
                write!(f, "page was written by an incompatible word-width or layout")
            }
            OpenError::SizeMismatch { expected, found } => write!(
                f,
                "backing file is {found} bytes, expected {expected} for this arena_size"
            ),
        }
    }
}

impl std::error::Error for OpenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OpenError::Open(err) | OpenError::Truncate(err) | OpenError::Map(err) => Some(err),
            OpenError::IncompatibleFormat | OpenError::SizeMismatch { .. } => None,
        }
    }
}

/// `push` refused a payload before ever reserving space for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushError {
    /// Default framing terminates messages with `0xFF`; a payload
    /// containing that byte would be indistinguishable from a frame
    /// boundary. Build with the `length-prefixed` feature to lift this.
    PayloadContainsTerminator,
    /// The message, including framing overhead, cannot possibly fit in
    /// any page of this arena size.
    PayloadTooLarge,
}

impl fmt::Display for PushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushError::PayloadContainsTerminator => {
                write!(f, "payload contains the 0xFF frame terminator byte")
            }
            PushError::PayloadTooLarge => write!(f, "payload does not fit in one page"),
        }
    }
}

impl std::error::Error for PushError {}

/// `pop` gave up waiting for in-flight writers to commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopTimeout;

impl fmt::Display for PopTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timed out waiting for in-flight writers to commit")
    }
}

impl std::error::Error for PopTimeout {}

/// A malformed message frame: scanned past the safe read horizon without
/// finding a terminator, or a length prefix whose terminator byte did not
/// match. This is a fatal invariant violation, never a retryable
/// condition: it indicates programmer error (a payload byte equal to
/// `0xFF` under default framing), header corruption, or reading a page
/// written under a different word width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameError;

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed message frame")
    }
}

impl std::error::Error for FrameError {}
