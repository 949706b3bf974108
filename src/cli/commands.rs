//! Implementation of the parcache CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cache::{FunctionCache, ParallelExecutorCache, ParallelFunctionCache, OUT_OF_DOMAIN_VALUE};
use crate::function::{CountingFunction, Objective, SlowFunction};
use crate::optimizer::{
    ControllerChain, FunctionOptimizer, MultidirectionalSearchOptimizer, OptimizationReport,
    StepLimitController, StepSizeController,
};
use crate::types::config::{Config, ObjectiveKind};
use crate::types::point::Point;
use crate::{ParCacheError, ParCacheResult};

/// Writes a default configuration file into the specified directory.
pub fn init(path: Option<PathBuf>) -> ParCacheResult<()> {
    let target_dir = path.unwrap_or_else(|| PathBuf::from("."));

    if !target_dir.exists() {
        std::fs::create_dir_all(&target_dir)?;
        tracing::info!("Directory created: {}", target_dir.display());
    }

    let config_path = target_dir.join("parcache.toml");

    if config_path.exists() {
        println!("Configuration already exists at: {}", config_path.display());
        return Ok(());
    }

    Config::default_config().save(&config_path)?;

    println!("parcache initialized successfully!");
    println!("Configuration created at: {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Adjust [objective] and [optimizer] in parcache.toml");
    println!("  2. Run an optimization: parcache optimize");

    Ok(())
}

/// Command line overrides for `optimize`.
#[derive(Debug, Default, Clone)]
pub struct OptimizeOptions {
    pub objective: Option<ObjectiveKind>,
    pub dimension: Option<usize>,
    pub threads: Option<usize>,
    pub max_steps: Option<usize>,
    pub json: bool,
}

/// Runs the multidirectional search on the configured objective.
pub fn optimize(options: OptimizeOptions, config: &Config) -> ParCacheResult<OptimizationReport> {
    let mut config = config.clone();
    if let Some(kind) = options.objective {
        config.objective.kind = kind;
    }
    if let Some(dimension) = options.dimension {
        config.objective.dimension = dimension;
        config.objective.start = None;
    }
    if let Some(threads) = options.threads {
        config.pool.threads = threads;
    }
    if let Some(max_steps) = options.max_steps {
        config.optimizer.max_steps = max_steps;
    }

    let dimension = config.objective.dimension;
    if dimension == 0 {
        return Err(ParCacheError::config("objective dimension must be at least 1"));
    }

    let start = match &config.objective.start {
        Some(coords) => Point::try_new(coords.clone())?,
        None => Point::filled(dimension, 0.5),
    };
    if start.dim() != dimension {
        return Err(ParCacheError::config(format!(
            "start point has dimension {}, objective has {}",
            start.dim(),
            dimension
        )));
    }

    let function = Arc::new(CountingFunction::new(SlowFunction::new(
        Objective::from_kind(config.objective.kind, dimension),
        Duration::from_millis(config.objective.delay_ms),
    )));

    let threads = config.pool.effective_threads();
    tracing::debug!(
        objective = %config.objective.kind,
        dimension,
        threads,
        "Configuration loaded"
    );

    let cache = ParallelExecutorCache::with_threads(threads)?.with_function(function.clone());
    let mut optimizer = MultidirectionalSearchOptimizer::from_config(cache, &config.optimizer);

    let spinner = if options.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    spinner.set_style(
        ProgressStyle::with_template("{spinner} step {pos} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));

    let progress = spinner.clone();
    let mut controller = ControllerChain::new()
        .with(StepLimitController::new(config.optimizer.max_steps))
        .with(StepSizeController::new(config.optimizer.min_step))
        .with(move |_: &Point, _: f64, _: &Point, value: f64, step: f64| {
            progress.inc(1);
            progress.set_message(format!("value={:.6e} step={:.3e}", value, step));
            true
        });

    let started_at = Utc::now();
    let outcome = optimizer.optimize(start.clone(), &mut controller);
    spinner.finish_and_clear();
    outcome?;

    let optimum = optimizer.optimum_point()?;
    let value = optimizer.optimum_value()?;
    let report = OptimizationReport::new(
        config.objective.kind.to_string(),
        started_at,
        &start,
        &optimum,
        value,
        function.count(),
        optimizer.statistics().clone(),
        optimizer.cache().stats(),
    );

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.summary());
    }

    optimizer.into_cache().shutdown();
    Ok(report)
}

/// Parses comma separated coordinates.
pub fn parse_point(text: &str) -> ParCacheResult<Point> {
    let coords = text
        .split(',')
        .map(|part| {
            part.trim().parse::<f64>().map_err(|e| {
                ParCacheError::InvalidPoint(format!("'{}' is not a number: {}", part.trim(), e))
            })
        })
        .collect::<ParCacheResult<Vec<f64>>>()?;
    Point::try_new(coords)
}

/// Evaluates the configured objective at one point through the parallel cache.
pub fn evaluate(point: &str, objective: Option<ObjectiveKind>, config: &Config) -> ParCacheResult<f64> {
    let point = parse_point(point)?;
    let kind = objective.unwrap_or(config.objective.kind);

    let mut cache = ParallelExecutorCache::with_threads(1)?
        .with_function(Arc::new(Objective::from_kind(kind, point.dim())));

    cache.compute(&point)?;
    cache.wait_for(&point)?;
    let value = cache.get_value(&point)?;

    if value == OUT_OF_DOMAIN_VALUE {
        println!("{} is outside the unit cube (value {:e})", point, value);
    } else {
        println!("{}({}) = {}", kind, point, value);
    }

    Ok(value)
}

/// Shows version.
pub fn version() {
    println!("parcache {}", env!("CARGO_PKG_VERSION"));
}

/// Loads `path` if it exists, otherwise the default configuration.
pub fn load_config(path: &Path) -> Config {
    Config::load_or_default(path).unwrap_or_else(|e| {
        eprintln!("Warning: ignoring invalid configuration {}: {}", path.display(), e);
        Config::default_config()
    })
}
