//! Cooperative cancellation signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::EvaluationError;

/// Shared cancellation flag handed to each evaluation.
///
/// Cancelling never interrupts a running evaluation; the function has to poll
/// [`CancellationToken::is_cancelled`] (or call [`CancellationToken::check`])
/// and return early.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns `Err(EvaluationError::Cancelled)` once cancellation was
    /// requested, for use with `?` inside long evaluations.
    pub fn check(&self) -> Result<(), EvaluationError> {
        if self.is_cancelled() {
            Err(EvaluationError::Cancelled)
        } else {
            Ok(())
        }
    }
}
