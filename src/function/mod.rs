//! Evaluable functions.
//!
//! A [`Function`] maps a [`Point`] to a value. Evaluations may be slow and
//! run on worker threads, so implementations must be `Send + Sync` and must
//! poll the [`CancellationToken`] they receive.
//!
//! - [`from_fn`] - adapter for plain closures
//! - [`builtin`] - test objectives and wrappers (counting, slow)

pub mod builtin;
mod cancel;

pub use builtin::{CoordinateSum, CountingFunction, Objective, Rosenbrock, SlowFunction, Sphere};
pub use cancel::CancellationToken;

use thiserror::Error;

use crate::types::point::Point;

/// Failure reported by [`Function::evaluate`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// The evaluation observed its cancellation signal and stopped.
    #[error("evaluation cancelled")]
    Cancelled,

    /// The function could not produce a value for this point.
    #[error("evaluation failed: {0}")]
    Failed(String),
}

impl EvaluationError {
    /// Creates a domain failure.
    pub fn failed<S: Into<String>>(reason: S) -> Self {
        Self::Failed(reason.into())
    }
}

/// An expensive, deterministic function of a point.
pub trait Function: Send + Sync {
    /// Evaluates the function at `point`.
    ///
    /// Long-running implementations must check `cancel` regularly and return
    /// [`EvaluationError::Cancelled`] once it is set.
    fn evaluate(&self, point: &Point, cancel: &CancellationToken) -> Result<f64, EvaluationError>;

    /// Returns an already known value for `point` without evaluating.
    ///
    /// Must be cheap and non-blocking. The default knows nothing.
    fn pre_computed(&self, _point: &Point) -> Option<f64> {
        None
    }
}

/// [`Function`] backed by a closure.
pub struct FnFunction<F> {
    f: F,
}

impl<F> Function for FnFunction<F>
where
    F: Fn(&Point) -> f64 + Send + Sync,
{
    fn evaluate(&self, point: &Point, cancel: &CancellationToken) -> Result<f64, EvaluationError> {
        cancel.check()?;
        Ok((self.f)(point))
    }
}

/// Wraps a closure as a [`Function`].
///
/// ```
/// use parcache::function::{from_fn, CancellationToken, Function};
/// use parcache::Point;
///
/// let f = from_fn(|p: &Point| p.get(0) + p.get(1));
/// let value = f.evaluate(&Point::new(vec![0.2, 0.3]), &CancellationToken::new()).unwrap();
/// assert!((value - 0.5).abs() < 1e-12);
/// ```
pub fn from_fn<F>(f: F) -> FnFunction<F>
where
    F: Fn(&Point) -> f64 + Send + Sync,
{
    FnFunction { f }
}
