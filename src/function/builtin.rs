//! Built-in functions.
//!
//! Objectives used by the command line and tests:
//! - `Sphere`: squared distance to a centre
//! - `Rosenbrock`: the classic banana valley, mapped onto the unit cube
//! - `CoordinateSum`: sum of the coordinates
//!
//! Wrappers:
//! - `CountingFunction`: counts evaluations
//! - `SlowFunction`: adds a cancellable delay to every evaluation

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::types::config::ObjectiveKind;
use crate::types::point::Point;

use super::{CancellationToken, EvaluationError, Function};

// ═══════════════════════════════════════════════════════════════════════════
// Objectives
// ═══════════════════════════════════════════════════════════════════════════

/// Squared Euclidean distance to `center`.
#[derive(Debug, Clone)]
pub struct Sphere {
    center: Point,
}

impl Sphere {
    /// Creates a sphere objective with its minimum at `center`.
    pub fn new(center: Point) -> Self {
        Self { center }
    }

    /// Sphere with its minimum at `0.25` in every coordinate.
    pub fn quarter(dim: usize) -> Self {
        Self::new(Point::filled(dim, 0.25))
    }

    /// Location of the minimum.
    pub fn center(&self) -> &Point {
        &self.center
    }
}

impl Function for Sphere {
    fn evaluate(&self, point: &Point, cancel: &CancellationToken) -> Result<f64, EvaluationError> {
        cancel.check()?;
        if point.dim() != self.center.dim() {
            return Err(EvaluationError::failed(format!(
                "expected dimension {}, got {}",
                self.center.dim(),
                point.dim()
            )));
        }
        Ok(point.sub(&self.center).length_squared())
    }
}

/// Rosenbrock function with each coordinate mapped from `[0, 1]` to `[-2, 2]`.
///
/// The minimum (value 0) lies at `0.75` in every coordinate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rosenbrock;

impl Rosenbrock {
    fn scale(c: f64) -> f64 {
        4.0 * c - 2.0
    }
}

impl Function for Rosenbrock {
    fn evaluate(&self, point: &Point, cancel: &CancellationToken) -> Result<f64, EvaluationError> {
        cancel.check()?;
        let x: Vec<f64> = point.as_slice().iter().map(|&c| Self::scale(c)).collect();

        if x.len() == 1 {
            return Ok((1.0 - x[0]).powi(2));
        }

        Ok(x.windows(2)
            .map(|w| 100.0 * (w[1] - w[0] * w[0]).powi(2) + (1.0 - w[0]).powi(2))
            .sum())
    }
}

/// Sum of all coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateSum;

impl Function for CoordinateSum {
    fn evaluate(&self, point: &Point, cancel: &CancellationToken) -> Result<f64, EvaluationError> {
        cancel.check()?;
        Ok(point.as_slice().iter().sum())
    }
}

/// One of the built-in objectives, selected by [`ObjectiveKind`].
#[derive(Debug, Clone)]
pub enum Objective {
    Sphere(Sphere),
    Rosenbrock(Rosenbrock),
    Sum(CoordinateSum),
}

impl Objective {
    /// Builds the objective of the given kind and dimension.
    pub fn from_kind(kind: ObjectiveKind, dim: usize) -> Self {
        match kind {
            ObjectiveKind::Sphere => Objective::Sphere(Sphere::quarter(dim)),
            ObjectiveKind::Rosenbrock => Objective::Rosenbrock(Rosenbrock),
            ObjectiveKind::Sum => Objective::Sum(CoordinateSum),
        }
    }
}

impl Function for Objective {
    fn evaluate(&self, point: &Point, cancel: &CancellationToken) -> Result<f64, EvaluationError> {
        match self {
            Objective::Sphere(f) => f.evaluate(point, cancel),
            Objective::Rosenbrock(f) => f.evaluate(point, cancel),
            Objective::Sum(f) => f.evaluate(point, cancel),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Wrappers
// ═══════════════════════════════════════════════════════════════════════════

/// Counts how many times the wrapped function was evaluated.
#[derive(Debug, Default)]
pub struct CountingFunction<F> {
    inner: F,
    count: AtomicUsize,
}

impl<F> CountingFunction<F> {
    /// Wraps `inner`.
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            count: AtomicUsize::new(0),
        }
    }

    /// Number of evaluations started so far.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// Resets the counter.
    pub fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }

    /// Borrows the wrapped function.
    pub fn inner(&self) -> &F {
        &self.inner
    }
}

impl<F: Function> Function for CountingFunction<F> {
    fn evaluate(&self, point: &Point, cancel: &CancellationToken) -> Result<f64, EvaluationError> {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.inner.evaluate(point, cancel)
    }

    fn pre_computed(&self, point: &Point) -> Option<f64> {
        self.inner.pre_computed(point)
    }
}

/// Delays every evaluation, polling the cancellation token while waiting.
#[derive(Debug)]
pub struct SlowFunction<F> {
    inner: F,
    delay: Duration,
}

impl<F> SlowFunction<F> {
    const POLL_INTERVAL: Duration = Duration::from_millis(2);

    /// Wraps `inner`, adding `delay` before each evaluation.
    pub fn new(inner: F, delay: Duration) -> Self {
        Self { inner, delay }
    }

    /// Configured delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl<F: Function> Function for SlowFunction<F> {
    fn evaluate(&self, point: &Point, cancel: &CancellationToken) -> Result<f64, EvaluationError> {
        let deadline = Instant::now() + self.delay;
        loop {
            cancel.check()?;
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep((deadline - now).min(Self::POLL_INTERVAL));
        }
        self.inner.evaluate(point, cancel)
    }

    fn pre_computed(&self, point: &Point) -> Option<f64> {
        self.inner.pre_computed(point)
    }
}
