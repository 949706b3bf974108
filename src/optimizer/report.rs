//! Summary of an optimization run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;
use crate::types::point::Point;

use super::OptimizerStatistics;

/// Result of one optimization run, suitable for printing or JSON export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    /// Unique run ID.
    pub run_id: String,

    /// Name of the objective.
    pub objective: String,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run finished.
    pub finished_at: DateTime<Utc>,

    /// Starting point.
    pub start: Vec<f64>,

    /// Best point found.
    pub optimum: Vec<f64>,

    /// Value at the best point.
    pub value: f64,

    /// Number of function evaluations started.
    pub evaluations: usize,

    /// Optimizer counters.
    pub optimizer: OptimizerStatistics,

    /// Cache counters.
    pub cache: CacheStats,
}

impl OptimizationReport {
    /// Creates a report for a run that started at `started_at` and ends now.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        objective: impl Into<String>,
        started_at: DateTime<Utc>,
        start: &Point,
        optimum: &Point,
        value: f64,
        evaluations: usize,
        optimizer: OptimizerStatistics,
        cache: CacheStats,
    ) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            objective: objective.into(),
            started_at,
            finished_at: Utc::now(),
            start: start.to_vec(),
            optimum: optimum.to_vec(),
            value,
            evaluations,
            optimizer,
            cache,
        }
    }

    /// Wall-clock duration of the run in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        self.finished_at
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }

    /// Multi-line human readable summary.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Run:         {}\n", self.run_id));
        out.push_str(&format!("Objective:   {}\n", self.objective));
        out.push_str(&format!("Start:       {:?}\n", self.start));
        out.push_str(&format!("Optimum:     {:?}\n", self.optimum));
        out.push_str(&format!("Value:       {:.6e}\n", self.value));
        out.push_str(&format!("Evaluations: {}\n", self.evaluations));
        out.push_str(&format!("Duration:    {} ms\n", self.duration_ms()));
        out.push_str(&format!("{}\n", self.optimizer));
        out.push_str(&format!("{}\n", self.cache));
        out
    }
}
