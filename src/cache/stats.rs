//! Cache counters.

use serde::{Deserialize, Serialize};

/// Counters describing what a cache did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Evaluations handed to the worker pool (or run inline).
    pub submitted: u64,

    /// Requests for points that were already pending or resolved.
    pub deduplicated: u64,

    /// Values taken from `Function::pre_computed`.
    pub precomputed: u64,

    /// Values recorded by waiting on an evaluation.
    pub resolved: u64,

    /// Values kept from evaluations that finished before being aborted.
    pub harvested: u64,

    /// Evaluations cancelled before they finished.
    pub cancelled: u64,

    /// Evaluations that ended in an error.
    pub failed: u64,

    /// Points currently being computed.
    pub pending: usize,

    /// Points currently holding a value.
    pub cached: usize,
}

impl CacheStats {
    /// Fraction of requests served without a new evaluation.
    pub fn dedup_rate(&self) -> f64 {
        let total = self.submitted + self.deduplicated + self.precomputed;
        if total == 0 {
            0.0
        } else {
            (self.deduplicated + self.precomputed) as f64 / total as f64
        }
    }
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CacheStats[submitted={}, deduplicated={}, precomputed={}, resolved={}, harvested={}, cancelled={}, failed={}, pending={}, cached={}]",
            self.submitted,
            self.deduplicated,
            self.precomputed,
            self.resolved,
            self.harvested,
            self.cancelled,
            self.failed,
            self.pending,
            self.cached
        )
    }
}
