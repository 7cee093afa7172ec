//! Cooperative cancellation and progress reporting.
//!
//! The pipeline checks the cancellation flag at chunk boundaries and
//! unwinds cleanly, discarding partially built chunks. Progress is an
//! explicit observer callback invoked at coarse stage granularity; it has
//! no suspension semantics and carries no ordering requirement.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag for one pipeline invocation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag; the pipeline stops at the next chunk boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// True once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Progress observer: receives the fraction of work done in `[0, 1]`.
pub type ProgressFn = Box<dyn Fn(f32) + Send>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_shared_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
