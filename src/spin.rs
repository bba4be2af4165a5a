use std::time::Duration;

/// Governs how long `Page::pop_with` spins waiting for in-flight writers
/// to drain before it may return `PopTimeout`.
///
/// The source this crate generalizes spins unboundedly; `Page::pop` keeps
/// that behavior for parity. `pop_with` accepts a policy so a caller can
/// cap how long a stalled writer can stall a reader that has already
/// caught up to `safe_end`.
#[derive(Clone, Copy, Debug)]
pub struct SpinPolicy {
    /// Yield to the scheduler between spin attempts rather than busy-loop.
    pub spin_yield: bool,
    pub max_spin_iters: Option<u64>,
    pub deadline: Option<Duration>,
}

impl SpinPolicy {
    /// Spins forever, cooperatively yielding. Matches the source's
    /// behavior; there is no bound on how long a stalled writer can stall
    /// a reader under this policy.
    pub const fn unbounded() -> Self {
        SpinPolicy {
            spin_yield: true,
            max_spin_iters: None,
            deadline: None,
        }
    }

    pub const fn bounded_iters(max_spin_iters: u64) -> Self {
        SpinPolicy {
            spin_yield: true,
            max_spin_iters: Some(max_spin_iters),
            deadline: None,
        }
    }

    pub const fn with_deadline(deadline: Duration) -> Self {
        SpinPolicy {
            spin_yield: true,
            max_spin_iters: None,
            deadline: Some(deadline),
        }
    }
}

impl Default for SpinPolicy {
    fn default() -> Self {
        Self::unbounded()
    }
}
