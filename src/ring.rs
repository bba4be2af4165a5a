//! The contract a directory-level ring of pages would use to sequence
//! them. Allocating pages, rolling over to a new one, and evicting old
//! ones under a `max_pages` policy are explicitly out of scope for this
//! crate; this module only names the boundary.
use std::path::{Path, PathBuf};

/// What the page core consumes from its enclosing ring.
///
/// A writer that observes [`crate::PushOutcome::Full`] asks its ring for
/// the next page's path via [`next_page_path`](PageTransition::next_page_path)
/// and opens it. A reader that observes [`crate::PopOutcome::Finished`]
/// does the same and resumes at cursor `0`.
pub trait PageTransition {
    type Error;

    fn next_page_path(&self, current: &Path) -> Result<PathBuf, Self::Error>;

    /// Called when a page falls off the back of a bounded ring and is no
    /// longer reachable by any live reader. The default does nothing,
    /// since eviction policy belongs to the ring, not the page.
    fn unlink(&self, _page: &Path) -> Result<(), Self::Error> {
        Ok(())
    }
}
