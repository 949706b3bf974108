//! Parallel function cache backed by a worker pool.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};

use crate::function::{CancellationToken, EvaluationError, Function};
use crate::types::point::Point;
use crate::{ParCacheError, ParCacheResult};

use super::pool::WorkerPool;
use super::stats::CacheStats;
use super::{AbortOutcome, FunctionCache, ParallelFunctionCache, OUT_OF_DOMAIN_VALUE};

type EvaluationOutcome = Result<f64, EvaluationError>;

/// An evaluation running (or queued) on the pool.
struct PendingEvaluation {
    handle: JoinHandle<EvaluationOutcome>,
    cancel: CancellationToken,
}

/// Function cache that evaluates points on a bounded worker pool.
///
/// Each tracked point is either pending (an evaluation is in flight) or
/// resolved (its value is stored), never both. Points outside the unit cube
/// are never tracked.
///
/// Per point the states move as follows:
/// - `untracked -> pending` on `compute`
/// - `pending -> resolved` on `wait_for`, or on `abort` of a finished
///   evaluation
/// - `pending -> untracked` on `abort` of an unfinished evaluation, or when
///   the evaluation fails
/// - every point back to `untracked` on `clear_cache` / `set_function`
pub struct ParallelExecutorCache {
    pool: WorkerPool,
    function: Option<Arc<dyn Function>>,
    pending: HashMap<Point, PendingEvaluation>,
    resolved: HashMap<Point, f64>,
    stats: CacheStats,
}

impl ParallelExecutorCache {
    /// Creates a cache with one worker per available core.
    pub fn new() -> ParCacheResult<Self> {
        Ok(Self::with_pool(WorkerPool::with_available_parallelism()?))
    }

    /// Creates a cache with `threads` workers.
    pub fn with_threads(threads: usize) -> ParCacheResult<Self> {
        Ok(Self::with_pool(WorkerPool::new(threads)?))
    }

    /// Creates a cache running evaluations on the blocking pool of an
    /// existing runtime.
    pub fn with_handle(handle: Handle) -> Self {
        Self::with_pool(WorkerPool::from_handle(handle))
    }

    /// Creates a cache on `pool`.
    pub fn with_pool(pool: WorkerPool) -> Self {
        Self {
            pool,
            function: None,
            pending: HashMap::new(),
            resolved: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// Installs `function` and returns the cache.
    #[must_use]
    pub fn with_function(mut self, function: Arc<dyn Function>) -> Self {
        self.function = Some(function);
        self
    }

    /// The worker pool.
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Whether an evaluation of `point` is in flight.
    pub fn is_pending(&self, point: &Point) -> bool {
        self.pending.contains_key(point)
    }

    /// Whether `point` holds a value.
    pub fn is_resolved(&self, point: &Point) -> bool {
        self.resolved.contains_key(point)
    }

    /// Whether `point` can be read without blocking: it is resolved, or its
    /// evaluation has finished and only needs to be collected.
    pub fn is_ready(&self, point: &Point) -> bool {
        self.is_resolved(point)
            || self
                .pending
                .get(point)
                .is_some_and(|pending| pending.handle.is_finished())
    }

    /// Number of evaluations in flight.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of points holding a value.
    pub fn resolved_len(&self) -> usize {
        self.resolved.len()
    }

    /// Aborts all pending work and releases the worker pool.
    pub fn shutdown(mut self) {
        self.abort_all();
    }

    fn require_function(&self) -> ParCacheResult<&Arc<dyn Function>> {
        self.function
            .as_ref()
            .ok_or_else(|| ParCacheError::protocol("no function installed, call set_function first"))
    }

    /// Turns the raw outcome of a task into a value or a categorized error.
    fn settle(
        point: &Point,
        outcome: Result<EvaluationOutcome, JoinError>,
    ) -> ParCacheResult<f64> {
        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(EvaluationError::Cancelled)) => Err(ParCacheError::EvaluationCancelled {
                point: point.clone(),
            }),
            Ok(Err(EvaluationError::Failed(reason))) => Err(ParCacheError::EvaluationFailed {
                point: point.clone(),
                reason,
            }),
            Err(err) if err.is_cancelled() => Err(ParCacheError::EvaluationCancelled {
                point: point.clone(),
            }),
            Err(err) => Err(ParCacheError::InternalFault {
                point: point.clone(),
                message: panic_message(err),
            }),
        }
    }

    /// Harvests a finished evaluation or cancels an unfinished one.
    fn withdraw(&mut self, point: Point, pending: PendingEvaluation) -> AbortOutcome {
        if !pending.handle.is_finished() {
            pending.cancel.cancel();
            pending.handle.abort();
            self.stats.cancelled += 1;
            tracing::debug!(point = %point, "Cancelled pending evaluation");
            return AbortOutcome::NotComputed;
        }

        let outcome = self.pool.block_on(pending.handle);
        match Self::settle(&point, outcome) {
            Ok(value) => {
                tracing::debug!(point = %point, value, "Harvested finished evaluation");
                self.resolved.insert(point, value);
                self.stats.harvested += 1;
                AbortOutcome::ComputedAnyway
            }
            Err(err) => {
                // The caller no longer wants this point.
                tracing::debug!(point = %point, error = %err, "Discarded failed evaluation on abort");
                self.stats.failed += 1;
                AbortOutcome::NotComputed
            }
        }
    }
}

impl FunctionCache for ParallelExecutorCache {
    /// Returns the resolved value of `point`.
    ///
    /// Fails with a protocol violation unless the point was resolved by
    /// `wait_for` or harvested by `abort`.
    fn get_value(&mut self, point: &Point) -> ParCacheResult<f64> {
        if !point.is_in_unit_cube() {
            return Ok(OUT_OF_DOMAIN_VALUE);
        }

        self.resolved.get(point).copied().ok_or_else(|| {
            ParCacheError::protocol(format!(
                "get_value called for {} but it has not been computed",
                point
            ))
        })
    }

    fn function(&self) -> Option<&Arc<dyn Function>> {
        self.function.as_ref()
    }

    fn set_function(&mut self, function: Arc<dyn Function>) {
        self.clear_cache();
        self.function = Some(function);
    }

    fn clear_cache(&mut self) {
        self.abort_all();
        self.resolved.clear();
        tracing::debug!("Cache cleared");
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            pending: self.pending.len(),
            cached: self.resolved.len(),
            ..self.stats.clone()
        }
    }
}

impl ParallelFunctionCache for ParallelExecutorCache {
    fn compute(&mut self, point: &Point) -> ParCacheResult<()> {
        if !point.is_in_unit_cube() {
            tracing::trace!(point = %point, "Skipping point outside domain");
            return Ok(());
        }

        if self.resolved.contains_key(point) || self.pending.contains_key(point) {
            self.stats.deduplicated += 1;
            return Ok(());
        }

        let function = Arc::clone(self.require_function()?);

        if let Some(value) = function.pre_computed(point) {
            tracing::trace!(point = %point, value, "Using pre-computed value");
            self.resolved.insert(point.clone(), value);
            self.stats.precomputed += 1;
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let task_point = point.clone();
        let handle = self.pool.spawn(move || -> EvaluationOutcome {
            task_cancel.check()?;
            function.evaluate(&task_point, &task_cancel)
        });

        tracing::debug!(point = %point, "Submitted evaluation");
        self.pending
            .insert(point.clone(), PendingEvaluation { handle, cancel });
        self.stats.submitted += 1;
        Ok(())
    }

    fn wait_for(&mut self, point: &Point) -> ParCacheResult<()> {
        if !point.is_in_unit_cube() || self.resolved.contains_key(point) {
            return Ok(());
        }

        let (key, pending) = self.pending.remove_entry(point).ok_or_else(|| {
            ParCacheError::protocol(format!(
                "wait_for called for {} but it is not being computed",
                point
            ))
        })?;

        let outcome = self.pool.block_on(pending.handle);
        match Self::settle(&key, outcome) {
            Ok(value) => {
                tracing::debug!(point = %key, value, "Evaluation resolved");
                self.resolved.insert(key, value);
                self.stats.resolved += 1;
                Ok(())
            }
            Err(err) => {
                if matches!(err, ParCacheError::InternalFault { .. }) {
                    tracing::warn!(point = %key, error = %err, "Evaluation worker faulted");
                } else {
                    tracing::debug!(point = %key, error = %err, "Evaluation did not produce a value");
                }
                self.stats.failed += 1;
                Err(err)
            }
        }
    }

    fn abort(&mut self, point: &Point) -> ParCacheResult<AbortOutcome> {
        if !point.is_in_unit_cube() {
            return Ok(AbortOutcome::NotComputed);
        }

        if self.resolved.contains_key(point) {
            return Ok(AbortOutcome::ComputedAnyway);
        }

        let (key, pending) = self.pending.remove_entry(point).ok_or_else(|| {
            ParCacheError::protocol(format!(
                "abort called for {} but it is not being computed",
                point
            ))
        })?;

        Ok(self.withdraw(key, pending))
    }

    fn abort_all(&mut self) {
        let drained: Vec<(Point, PendingEvaluation)> = self.pending.drain().collect();
        if drained.is_empty() {
            return;
        }

        tracing::debug!(count = drained.len(), "Aborting all pending evaluations");
        for (point, pending) in drained {
            self.withdraw(point, pending);
        }
    }
}

impl Drop for ParallelExecutorCache {
    fn drop(&mut self) {
        for pending in self.pending.values() {
            pending.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for ParallelExecutorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelExecutorCache")
            .field("pool", &self.pool)
            .field("has_function", &self.function.is_some())
            .field("pending", &self.pending.len())
            .field("resolved", &self.resolved.len())
            .finish()
    }
}

fn panic_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => {
            if let Some(msg) = payload.downcast_ref::<&str>() {
                (*msg).to_string()
            } else if let Some(msg) = payload.downcast_ref::<String>() {
                msg.clone()
            } else {
                "evaluation panicked".to_string()
            }
        }
        Err(err) => err.to_string(),
    }
}
