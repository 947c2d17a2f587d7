//! Cancellation requests

use core::sync::atomic::{AtomicBool, Ordering};

/// Source of abort requests, polled between separation phases
pub trait AbortSignal {
    fn abort_requested(&self) -> bool;
}

impl AbortSignal for AtomicBool {
    fn abort_requested(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

impl<S: AbortSignal + ?Sized> AbortSignal for &S {
    fn abort_requested(&self) -> bool {
        S::abort_requested(self)
    }
}

/// Signal that never requests an abort
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAbort;

impl AbortSignal for NoAbort {
    fn abort_requested(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_abort() {
        let flag = AtomicBool::new(false);
        assert!(!flag.abort_requested());

        flag.store(true, Ordering::Release);
        assert!((&flag).abort_requested());
        assert!(!NoAbort.abort_requested());
    }
}
