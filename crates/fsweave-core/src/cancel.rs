//! Single-use cancellation tokens for transfers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio_util::sync::CancellationToken;

const ACTIVE: u8 = 0;
const CANCEL_REQUESTED: u8 = 1;
const COMPLETED: u8 = 2;

/// A shared flag letting a caller request early termination of one
/// in-flight transfer.
///
/// The token moves from *active* to *cancel-requested* at most once. Once
/// the transfer it guards has completed, further [`cancel`](Self::cancel)
/// calls are no-ops. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: CancellationToken,
    state: Arc<AtomicU8>,
}

impl CancelToken {
    /// Create a new active token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    ///
    /// Returns `true` if this call moved the token to cancel-requested,
    /// `false` if it was already cancelled or its transfer has completed.
    pub fn cancel(&self) -> bool {
        let moved = self
            .state
            .compare_exchange(ACTIVE, CANCEL_REQUESTED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if moved {
            self.inner.cancel();
        }
        moved
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCEL_REQUESTED
    }

    /// Check if the guarded transfer has completed without cancellation.
    pub fn is_completed(&self) -> bool {
        self.state.load(Ordering::Acquire) == COMPLETED
    }

    /// Mark the guarded transfer as finished.
    ///
    /// A token that was already cancel-requested keeps that state.
    pub fn complete(&self) {
        let _ = self
            .state
            .compare_exchange(ACTIVE, COMPLETED, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Wait until cancellation is requested.
    ///
    /// Never resolves for a token that completes without being cancelled.
    pub async fn cancelled(&self) {
        self.inner.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_transitions_once() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.cancel());
        assert!(token.is_cancelled());
        assert!(!token.cancel());
    }

    #[test]
    fn test_cancel_after_completion_is_noop() {
        let token = CancelToken::new();
        token.complete();
        assert!(!token.cancel());
        assert!(!token.is_cancelled());
        assert!(token.is_completed());
    }

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let caller_side = token.clone();
        caller_side.cancel();
        assert!(token.is_cancelled());

        // Completing a cancelled token keeps it cancelled.
        token.complete();
        assert!(token.is_cancelled());
    }
}
