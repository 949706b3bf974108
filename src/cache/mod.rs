//! Function caches.
//!
//! [`FunctionCache`] is the synchronous compute-or-fetch contract over a
//! [`Function`]. [`ParallelFunctionCache`] adds speculative background
//! evaluation: points are submitted with `compute`, resolved with
//! `wait_for`, and withdrawn with `abort`.
//!
//! Points outside the unit cube are never evaluated. `get_value` reports
//! [`OUT_OF_DOMAIN_VALUE`] for them and `compute`/`abort` ignore them.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use parcache::cache::{FunctionCache, ParallelExecutorCache, ParallelFunctionCache};
//! use parcache::function::from_fn;
//!
//! let mut cache = ParallelExecutorCache::with_threads(4)?;
//! cache.set_function(Arc::new(from_fn(|p| p.get(0) + p.get(1))));
//!
//! cache.compute_all(&candidates)?;
//! cache.wait_for(&candidates[0])?;
//! let value = cache.get_value(&candidates[0])?;
//! cache.abort_many(&candidates[1..])?;
//! ```

mod executor;
mod pool;
mod serial;
mod stats;

pub use executor::ParallelExecutorCache;
pub use pool::WorkerPool;
pub use serial::SerialFunctionCache;
pub use stats::CacheStats;

use std::sync::Arc;

use crate::function::Function;
use crate::types::point::Point;
use crate::ParCacheResult;

/// Value reported by `get_value` for points outside the unit cube.
pub const OUT_OF_DOMAIN_VALUE: f64 = f64::MAX;

/// Result of aborting a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortOutcome {
    /// The evaluation had already finished; its value was kept.
    ComputedAnyway,
    /// No value is available; any running evaluation was cancelled.
    NotComputed,
}

impl AbortOutcome {
    /// Whether a value for the point is available after the abort.
    pub fn was_computed(self) -> bool {
        matches!(self, AbortOutcome::ComputedAnyway)
    }
}

/// Synchronous cache over a [`Function`].
pub trait FunctionCache {
    /// Returns the value at `point`.
    ///
    /// Out-of-domain points yield [`OUT_OF_DOMAIN_VALUE`].
    fn get_value(&mut self, point: &Point) -> ParCacheResult<f64>;

    /// Currently installed function.
    fn function(&self) -> Option<&Arc<dyn Function>>;

    /// Installs a new function, discarding every cached result.
    fn set_function(&mut self, function: Arc<dyn Function>);

    /// Discards every cached result.
    fn clear_cache(&mut self);

    /// Cache counters.
    fn stats(&self) -> CacheStats;
}

/// Cache that evaluates points in the background.
///
/// All methods are called from a single controlling thread; only the
/// evaluations themselves run in parallel.
pub trait ParallelFunctionCache: FunctionCache {
    /// Submits `point` for background evaluation.
    ///
    /// Does nothing if the point is already pending, already resolved, or out
    /// of domain.
    fn compute(&mut self, point: &Point) -> ParCacheResult<()>;

    /// Submits every point of `points`.
    fn compute_all(&mut self, points: &[Point]) -> ParCacheResult<()> {
        for point in points {
            self.compute(point)?;
        }
        Ok(())
    }

    /// Blocks until `point` is resolved.
    ///
    /// Fails with a protocol violation if the point is neither pending nor
    /// resolved, and propagates cancellation and evaluation failures.
    fn wait_for(&mut self, point: &Point) -> ParCacheResult<()>;

    /// Blocks until every point of `points` is resolved.
    fn wait_for_all(&mut self, points: &[Point]) -> ParCacheResult<()> {
        for point in points {
            self.wait_for(point)?;
        }
        Ok(())
    }

    /// Withdraws interest in `point`.
    ///
    /// A finished evaluation is harvested ([`AbortOutcome::ComputedAnyway`]);
    /// a running one is cancelled ([`AbortOutcome::NotComputed`]).
    fn abort(&mut self, point: &Point) -> ParCacheResult<AbortOutcome>;

    /// Aborts every point of `points`.
    ///
    /// Every point is aborted even when some of them fail; the first error is
    /// returned afterwards.
    fn abort_many(&mut self, points: &[Point]) -> ParCacheResult<Vec<AbortOutcome>> {
        let mut outcomes = Vec::with_capacity(points.len());
        let mut first_error = None;
        for point in points {
            match self.abort(point) {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(outcomes),
        }
    }

    /// Aborts every pending evaluation.
    fn abort_all(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_outcome() {
        assert!(AbortOutcome::ComputedAnyway.was_computed());
        assert!(!AbortOutcome::NotComputed.was_computed());
    }
}
