//! Single-threaded compute-or-fetch cache.

use std::collections::HashMap;
use std::sync::Arc;

use crate::function::{CancellationToken, EvaluationError, Function};
use crate::types::point::Point;
use crate::{ParCacheError, ParCacheResult};

use super::stats::CacheStats;
use super::{AbortOutcome, FunctionCache, ParallelFunctionCache, OUT_OF_DOMAIN_VALUE};

/// Cache that evaluates points inline on the caller's thread the first time
/// their value is requested.
///
/// Unlike [`ParallelExecutorCache`](super::ParallelExecutorCache), which
/// reports a panicking function as `InternalFault`, a panic here unwinds
/// straight through `get_value` or `compute` into the caller.
#[derive(Default)]
pub struct SerialFunctionCache {
    function: Option<Arc<dyn Function>>,
    values: HashMap<Point, f64>,
    stats: CacheStats,
}

impl SerialFunctionCache {
    /// Creates an empty cache without a function.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache over `function`.
    pub fn with_function(function: Arc<dyn Function>) -> Self {
        Self {
            function: Some(function),
            ..Self::default()
        }
    }

    /// Whether `point` already holds a value.
    pub fn contains(&self, point: &Point) -> bool {
        self.values.contains_key(point)
    }
}

impl FunctionCache for SerialFunctionCache {
    fn get_value(&mut self, point: &Point) -> ParCacheResult<f64> {
        if !point.is_in_unit_cube() {
            return Ok(OUT_OF_DOMAIN_VALUE);
        }

        if let Some(&value) = self.values.get(point) {
            self.stats.deduplicated += 1;
            return Ok(value);
        }

        let function = self
            .function
            .as_ref()
            .ok_or_else(|| ParCacheError::protocol("no function installed, call set_function first"))?;

        let value = match function.pre_computed(point) {
            Some(value) => {
                self.stats.precomputed += 1;
                value
            }
            None => {
                self.stats.submitted += 1;
                match function.evaluate(point, &CancellationToken::new()) {
                    Ok(value) => value,
                    Err(EvaluationError::Cancelled) => {
                        self.stats.failed += 1;
                        return Err(ParCacheError::EvaluationCancelled {
                            point: point.clone(),
                        });
                    }
                    Err(EvaluationError::Failed(reason)) => {
                        self.stats.failed += 1;
                        return Err(ParCacheError::EvaluationFailed {
                            point: point.clone(),
                            reason,
                        });
                    }
                }
            }
        };

        self.values.insert(point.clone(), value);
        self.stats.resolved += 1;
        Ok(value)
    }

    fn function(&self) -> Option<&Arc<dyn Function>> {
        self.function.as_ref()
    }

    fn set_function(&mut self, function: Arc<dyn Function>) {
        self.clear_cache();
        self.function = Some(function);
    }

    fn clear_cache(&mut self) {
        self.values.clear();
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            cached: self.values.len(),
            ..self.stats.clone()
        }
    }
}

/// Evaluates eagerly inside `compute`, so there is never anything to wait
/// for or cancel. Useful as a deterministic baseline for optimizers.
impl ParallelFunctionCache for SerialFunctionCache {
    fn compute(&mut self, point: &Point) -> ParCacheResult<()> {
        self.get_value(point).map(|_| ())
    }

    fn wait_for(&mut self, point: &Point) -> ParCacheResult<()> {
        if !point.is_in_unit_cube() || self.values.contains_key(point) {
            return Ok(());
        }
        Err(ParCacheError::protocol(format!(
            "wait_for called for {} but it has not been computed",
            point
        )))
    }

    fn abort(&mut self, point: &Point) -> ParCacheResult<AbortOutcome> {
        if !point.is_in_unit_cube() {
            return Ok(AbortOutcome::NotComputed);
        }
        if self.values.contains_key(point) {
            return Ok(AbortOutcome::ComputedAnyway);
        }
        Err(ParCacheError::protocol(format!(
            "abort called for {} but it has not been computed",
            point
        )))
    }

    fn abort_all(&mut self) {}
}
