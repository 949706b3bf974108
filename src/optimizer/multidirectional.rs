//! Parallel multidirectional search (Dennis & Torczon).

use std::iter;

use crate::cache::{FunctionCache, ParallelFunctionCache};
use crate::types::config::{OptimizerConfig, PatternKind};
use crate::types::point::Point;
use crate::{ParCacheError, ParCacheResult};

use super::controller::OptimizationController;
use super::pattern::SearchPattern;
use super::{FunctionOptimizer, OptimizerStatistics};

/// Parallel pattern search over a simplex.
///
/// Each step reflects the simplex through its best vertex. While the
/// reflection is evaluated, the optional expansion and coordinate search
/// candidates are evaluated speculatively on the same cache; whichever turns
/// out to be unneeded is aborted. If nothing improves on the best vertex the
/// simplex is contracted towards it and the step halves.
pub struct MultidirectionalSearchOptimizer<C> {
    cache: C,
    simplex: Vec<Point>,
    initial_step: f64,
    pattern: PatternKind,
    use_expansion: bool,
    use_coordinate_search: bool,
    statistics: OptimizerStatistics,
}

impl<C: ParallelFunctionCache> MultidirectionalSearchOptimizer<C> {
    /// Creates an optimizer over `cache` with a square pattern and an initial
    /// step of 0.5.
    pub fn new(cache: C) -> Self {
        Self {
            cache,
            simplex: Vec::new(),
            initial_step: 0.5,
            pattern: PatternKind::Square,
            use_expansion: false,
            use_coordinate_search: false,
            statistics: OptimizerStatistics::default(),
        }
    }

    /// Creates an optimizer from configuration.
    pub fn from_config(cache: C, config: &OptimizerConfig) -> Self {
        Self::new(cache)
            .with_initial_step(config.initial_step)
            .with_pattern(config.pattern)
            .with_expansion(config.use_expansion)
            .with_coordinate_search(config.use_coordinate_search)
    }

    /// Sets the initial step.
    #[must_use]
    pub fn with_initial_step(mut self, step: f64) -> Self {
        self.initial_step = step;
        self
    }

    /// Sets the initial search pattern.
    #[must_use]
    pub fn with_pattern(mut self, pattern: PatternKind) -> Self {
        self.pattern = pattern;
        self
    }

    /// Enables expansion steps.
    #[must_use]
    pub fn with_expansion(mut self, enabled: bool) -> Self {
        self.use_expansion = enabled;
        self
    }

    /// Enables the coordinate search.
    #[must_use]
    pub fn with_coordinate_search(mut self, enabled: bool) -> Self {
        self.use_coordinate_search = enabled;
        self
    }

    /// The underlying cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// The underlying cache, mutably.
    pub fn cache_mut(&mut self) -> &mut C {
        &mut self.cache
    }

    /// Consumes the optimizer, returning its cache.
    pub fn into_cache(self) -> C {
        self.cache
    }

    /// Current simplex, best vertex first.
    pub fn simplex(&self) -> &[Point] {
        &self.simplex
    }

    /// Sorts the simplex by value, best first. Every vertex must be resolved.
    fn sort_simplex(&mut self) -> ParCacheResult<()> {
        let mut keyed = Vec::with_capacity(self.simplex.len());
        for point in self.simplex.drain(..) {
            let value = self.cache.get_value(&point)?;
            keyed.push((value, point));
        }
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.simplex = keyed.into_iter().map(|(_, point)| point).collect();
        Ok(())
    }

    /// Whether any of `points` improves on `current_value`.
    fn accept(&mut self, points: &[Point], current_value: f64) -> ParCacheResult<bool> {
        for point in points {
            if self.cache.get_value(point)? < current_value {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Best of `points` by value.
    fn best_of(&mut self, points: &[Point]) -> ParCacheResult<Option<Point>> {
        let mut best: Option<(f64, &Point)> = None;
        for point in points {
            let value = self.cache.get_value(point)?;
            if best.map_or(true, |(best_value, _)| value < best_value) {
                best = Some((value, point));
            }
        }
        Ok(best.map(|(_, point)| point.clone()))
    }

    fn build_simplex(center: &Point, pattern: &[Point], step: f64) -> Vec<Point> {
        iter::once(center.clone())
            .chain(pattern.iter().map(|d| center.add(&d.mul(step))))
            .collect()
    }

    /// `2c - p` for every non-best vertex `p`.
    fn reflection(simplex: &[Point]) -> Vec<Point> {
        let doubled = simplex[0].mul(2.0);
        simplex[1..].iter().map(|p| doubled.sub(p)).collect()
    }

    /// `3c - 2p` for every non-best vertex `p`.
    fn expansion(simplex: &[Point]) -> Vec<Point> {
        let tripled = simplex[0].mul(3.0);
        simplex[1..]
            .iter()
            .map(|p| tripled.sub(&p.mul(2.0)))
            .collect()
    }

    /// `(p + c) / 2` for every non-best vertex `p`.
    fn contract(simplex: &mut [Point]) {
        let current = simplex[0].clone();
        for p in simplex[1..].iter_mut() {
            *p = p.add(&current).mul(0.5);
        }
    }

    /// `c ± step·e_i` for every axis.
    fn coordinate_search(current: &Point, step: f64) -> Vec<Point> {
        let mut points = Vec::with_capacity(current.dim() * 2);
        for i in 0..current.dim() {
            let offset = Point::zeros(current.dim()).set(i, step);
            points.push(current.add(&offset));
            points.push(current.sub(&offset));
        }
        points
    }
}

impl<C: ParallelFunctionCache> FunctionOptimizer for MultidirectionalSearchOptimizer<C> {
    fn optimize(
        &mut self,
        initial: Point,
        control: &mut dyn OptimizationController,
    ) -> ParCacheResult<()> {
        let pattern = SearchPattern::from_kind(self.pattern, initial.dim());
        tracing::info!(
            start = %initial,
            pattern = ?self.pattern,
            expansion = self.use_expansion,
            coordinate_search = self.use_coordinate_search,
            "Starting optimization"
        );

        let mut step = self.initial_step;
        self.simplex = Self::build_simplex(&initial, &pattern, step);
        let mut simplex_computed = false;

        loop {
            tracing::debug!(step, computed = simplex_computed, "Starting optimization step");
            self.statistics.step_count += 1;

            if !simplex_computed {
                self.cache.compute_all(&self.simplex)?;
                self.cache.wait_for_all(&self.simplex)?;
                self.sort_simplex()?;
                simplex_computed = true;
            }

            let current = self.simplex[0].clone();
            let current_value = self.cache.get_value(&current)?;
            let mut best = current.clone();

            // Queue candidates in order of likely usefulness.
            let reflection = Self::reflection(&self.simplex);
            let coordinate = if self.use_coordinate_search {
                Self::coordinate_search(&current, step)
            } else {
                Vec::new()
            };
            let expansion = if self.use_expansion {
                Self::expansion(&self.simplex)
            } else {
                Vec::new()
            };

            self.cache.compute_all(&reflection)?;
            self.cache.compute_all(&coordinate)?;
            self.cache.compute_all(&expansion)?;

            self.cache.wait_for_all(&reflection)?;

            if self.accept(&reflection, current_value)? {
                tracing::debug!("Reflection accepted");
                self.cache.abort_many(&coordinate)?;

                self.simplex = iter::once(current.clone()).chain(reflection).collect();
                self.sort_simplex()?;

                if self.use_expansion {
                    // Expect the expansion to fail and queue the next reflection meanwhile.
                    let next_reflection = Self::reflection(&self.simplex);
                    self.cache.compute_all(&next_reflection)?;
                    self.cache.wait_for_all(&expansion)?;

                    if self.accept(&expansion, current_value)? {
                        tracing::debug!("Expansion accepted");
                        self.cache.abort_many(&next_reflection)?;
                        self.simplex = iter::once(current.clone()).chain(expansion).collect();
                        self.sort_simplex()?;
                        step *= 2.0;
                        self.statistics.expansion_acceptance += 1;
                    } else {
                        self.statistics.reflection_acceptance += 1;
                    }
                } else {
                    self.statistics.reflection_acceptance += 1;
                }
                best = self.simplex[0].clone();
            } else {
                tracing::debug!("Reflection rejected");
                self.cache.abort_many(&expansion)?;

                // Expect the coordinate search to fail and queue the contraction meanwhile.
                Self::contract(&mut self.simplex);
                self.cache.compute_all(&self.simplex)?;

                let mut improved = None;
                if self.use_coordinate_search {
                    self.cache.wait_for_all(&coordinate)?;
                    if self.accept(&coordinate, current_value)? {
                        improved = self.best_of(&coordinate)?;
                    }
                }

                match improved {
                    Some(center) => {
                        tracing::debug!(center = %center, "Coordinate search accepted, rebuilding simplex");
                        let contracted = std::mem::take(&mut self.simplex);
                        self.simplex = Self::build_simplex(&center, &pattern, step);
                        let unused: Vec<Point> = contracted
                            .into_iter()
                            .filter(|p| !self.simplex.contains(p))
                            .collect();
                        self.cache.abort_many(&unused)?;
                        self.statistics.coordinate_acceptance += 1;
                        best = center;
                    }
                    None => {
                        step /= 2.0;
                        self.statistics.reduction_fallback += 1;
                    }
                }
                simplex_computed = false;
            }

            let best_value = self.cache.get_value(&best)?;

            if !control.step_taken(&current, current_value, &best, best_value, step) {
                break;
            }
        }

        if !simplex_computed {
            self.cache.compute_all(&self.simplex)?;
            self.cache.wait_for_all(&self.simplex)?;
            self.sort_simplex()?;
        }
        self.cache.abort_all();

        let optimum = self.simplex[0].clone();
        let value = self.cache.get_value(&optimum)?;
        tracing::info!(point = %optimum, value, statistics = %self.statistics, "Optimization finished");
        Ok(())
    }

    fn optimum_point(&self) -> ParCacheResult<Point> {
        self.simplex.first().cloned().ok_or_else(|| {
            ParCacheError::protocol("optimization has not been run, simplex is empty")
        })
    }

    fn optimum_value(&mut self) -> ParCacheResult<f64> {
        let point = self.optimum_point()?;
        self.cache.get_value(&point)
    }

    fn statistics(&self) -> &OptimizerStatistics {
        &self.statistics
    }

    fn reset_statistics(&mut self) {
        self.statistics = OptimizerStatistics::default();
    }
}
