//! Derivative-free optimization on top of a [`ParallelFunctionCache`].
//!
//! The optimizer submits candidate points speculatively, waits only for the
//! ones it needs and aborts the rest.
//!
//! - [`MultidirectionalSearchOptimizer`] - parallel pattern search
//! - [`SearchPattern`] - initial simplex shapes
//! - [`OptimizationController`] - stop conditions
//!
//! [`ParallelFunctionCache`]: crate::cache::ParallelFunctionCache

mod controller;
mod multidirectional;
mod pattern;
mod report;

pub use controller::{
    ControllerChain, OptimizationController, StepLimitController, StepSizeController,
};
pub use multidirectional::MultidirectionalSearchOptimizer;
pub use pattern::SearchPattern;
pub use report::OptimizationReport;

use serde::{Deserialize, Serialize};

use crate::types::point::Point;
use crate::ParCacheResult;

/// A function minimizer.
pub trait FunctionOptimizer {
    /// Minimizes the cached function starting from `initial`, until
    /// `control` asks to stop.
    fn optimize(
        &mut self,
        initial: Point,
        control: &mut dyn OptimizationController,
    ) -> ParCacheResult<()>;

    /// Best point found. Fails if `optimize` has not run.
    fn optimum_point(&self) -> ParCacheResult<Point>;

    /// Value at the best point.
    fn optimum_value(&mut self) -> ParCacheResult<f64>;

    /// Counters of the runs since the last reset.
    fn statistics(&self) -> &OptimizerStatistics;

    /// Resets the counters.
    fn reset_statistics(&mut self);
}

/// Step outcome counters of a pattern search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizerStatistics {
    /// Steps taken.
    pub step_count: u64,
    /// Steps that kept the reflected simplex.
    pub reflection_acceptance: u64,
    /// Steps that kept the expanded simplex.
    pub expansion_acceptance: u64,
    /// Steps where the coordinate search found a better point.
    pub coordinate_acceptance: u64,
    /// Steps that fell back to shrinking the simplex.
    pub reduction_fallback: u64,
}

impl std::fmt::Display for OptimizerStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "OptimizerStatistics[steps={}, reflection={}, expansion={}, coordinate={}, reduction={}]",
            self.step_count,
            self.reflection_acceptance,
            self.expansion_acceptance,
            self.coordinate_acceptance,
            self.reduction_fallback
        )
    }
}
