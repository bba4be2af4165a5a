//! Lock-free, memory-mapped append log shared between processes.
//!
//! A [`Page`] is one fixed-size file, mapped `MAP_SHARED` into every
//! process that opens it: three atomic header words plus a byte arena of
//! self-delimited messages. Any number of writer threads in any number
//! of processes may [`Page::push`] concurrently; any number of readers
//! may [`Page::pop`] concurrently. Neither takes a kernel lock.
//!
//! This crate is the page itself, not the ring that sequences pages into
//! a channel: allocating new pages, rolling over on `PushOutcome::Full`,
//! and evicting old ones are the job of whatever embeds this crate (see
//! [`ring::PageTransition`]).
mod error;
mod frame;
mod page;
mod ring;
mod spin;


pub use error::{FrameError, OpenError, PopTimeout, PushError};
pub use page::{Page, PageOptions, PopOutcome, PushOutcome, DEFAULT_ARENA_SIZE};
pub use ring::PageTransition;
pub use spin::SpinPolicy;
