//! Optimization controllers decide when a search stops.

use crate::types::point::Point;

/// Called after every optimization step.
pub trait OptimizationController {
    /// Reports a finished step; returns `false` to stop the optimization.
    ///
    /// `old_point`/`old_value` is the best point before the step,
    /// `new_point`/`new_value` the best point after it.
    fn step_taken(
        &mut self,
        old_point: &Point,
        old_value: f64,
        new_point: &Point,
        new_value: f64,
        step_size: f64,
    ) -> bool;
}

impl<F> OptimizationController for F
where
    F: FnMut(&Point, f64, &Point, f64, f64) -> bool,
{
    fn step_taken(
        &mut self,
        old_point: &Point,
        old_value: f64,
        new_point: &Point,
        new_value: f64,
        step_size: f64,
    ) -> bool {
        self(old_point, old_value, new_point, new_value, step_size)
    }
}

/// Stops after a fixed number of steps.
#[derive(Debug, Clone)]
pub struct StepLimitController {
    max_steps: usize,
    steps: usize,
}

impl StepLimitController {
    /// Allows at most `max_steps` steps.
    pub fn new(max_steps: usize) -> Self {
        Self {
            max_steps,
            steps: 0,
        }
    }

    /// Steps seen so far.
    pub fn steps(&self) -> usize {
        self.steps
    }
}

impl OptimizationController for StepLimitController {
    fn step_taken(&mut self, _: &Point, _: f64, _: &Point, _: f64, _: f64) -> bool {
        self.steps += 1;
        self.steps < self.max_steps
    }
}

/// Stops once the pattern step shrinks below a threshold.
#[derive(Debug, Clone)]
pub struct StepSizeController {
    min_step: f64,
}

impl StepSizeController {
    /// Continues while the step is at least `min_step`.
    pub fn new(min_step: f64) -> Self {
        Self { min_step }
    }
}

impl OptimizationController for StepSizeController {
    fn step_taken(&mut self, _: &Point, _: f64, _: &Point, _: f64, step_size: f64) -> bool {
        step_size >= self.min_step
    }
}

/// Combines controllers; the search continues only while all of them agree.
///
/// Every controller is notified of every step, even after one asked to stop.
#[derive(Default)]
pub struct ControllerChain {
    controllers: Vec<Box<dyn OptimizationController>>,
}

impl ControllerChain {
    /// Creates an empty chain, which never stops the search.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a controller.
    #[must_use]
    pub fn with(mut self, controller: impl OptimizationController + 'static) -> Self {
        self.controllers.push(Box::new(controller));
        self
    }

    /// Appends a boxed controller.
    pub fn push(&mut self, controller: Box<dyn OptimizationController>) {
        self.controllers.push(controller);
    }

    /// Number of controllers.
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}

impl OptimizationController for ControllerChain {
    fn step_taken(
        &mut self,
        old_point: &Point,
        old_value: f64,
        new_point: &Point,
        new_value: f64,
        step_size: f64,
    ) -> bool {
        let mut proceed = true;
        for controller in &mut self.controllers {
            proceed &= controller.step_taken(old_point, old_value, new_point, new_value, step_size);
        }
        proceed
    }
}
