//! Configuration for parcache.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ParCacheResult;

/// Main configuration for parcache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Worker pool settings.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Optimizer settings.
    #[serde(default)]
    pub optimizer: OptimizerConfig,

    /// Objective function settings.
    #[serde(default)]
    pub objective: ObjectiveConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Worker pool settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of evaluation threads (0 = available parallelism).
    #[serde(default)]
    pub threads: usize,
}

impl PoolConfig {
    /// Resolves the configured thread count, falling back to the number of
    /// available cores.
    pub fn effective_threads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

/// Multidirectional search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Initial pattern step.
    #[serde(default = "default_initial_step")]
    pub initial_step: f64,

    /// Try an expansion step after a successful reflection.
    #[serde(default)]
    pub use_expansion: bool,

    /// Run a coordinate search alongside each reflection.
    #[serde(default)]
    pub use_coordinate_search: bool,

    /// Stop after this many steps.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Stop once the step falls below this size.
    #[serde(default = "default_min_step")]
    pub min_step: f64,

    /// Initial search pattern.
    #[serde(default)]
    pub pattern: PatternKind,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            initial_step: default_initial_step(),
            use_expansion: false,
            use_coordinate_search: false,
            max_steps: default_max_steps(),
            min_step: default_min_step(),
            pattern: PatternKind::default(),
        }
    }
}

fn default_initial_step() -> f64 {
    0.5
}

fn default_max_steps() -> usize {
    200
}

fn default_min_step() -> f64 {
    1e-6
}

/// Search pattern used to build the initial simplex.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Unit vectors along each axis.
    #[default]
    Square,
    /// Regular simplex with a vertex at the origin.
    RegularSimplex,
}

/// Objective function settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveConfig {
    /// Built-in objective to optimize.
    #[serde(default)]
    pub kind: ObjectiveKind,

    /// Dimension of the search space.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Starting point (defaults to the centre of the unit cube).
    #[serde(default)]
    pub start: Option<Vec<f64>>,

    /// Artificial delay per evaluation in milliseconds.
    #[serde(default)]
    pub delay_ms: u64,
}

impl Default for ObjectiveConfig {
    fn default() -> Self {
        Self {
            kind: ObjectiveKind::default(),
            dimension: default_dimension(),
            start: None,
            delay_ms: 0,
        }
    }
}

fn default_dimension() -> usize {
    2
}

/// Built-in objectives.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    /// Squared distance to a fixed centre.
    #[default]
    Sphere,
    /// Rosenbrock valley mapped onto the unit cube.
    Rosenbrock,
    /// Sum of coordinates.
    Sum,
}

impl std::fmt::Display for ObjectiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectiveKind::Sphere => write!(f, "sphere"),
            ObjectiveKind::Rosenbrock => write!(f, "rosenbrock"),
            ObjectiveKind::Sum => write!(f, "sum"),
        }
    }
}

impl std::str::FromStr for ObjectiveKind {
    type Err = crate::ParCacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sphere" => Ok(ObjectiveKind::Sphere),
            "rosenbrock" => Ok(ObjectiveKind::Rosenbrock),
            "sum" => Ok(ObjectiveKind::Sum),
            other => Err(crate::ParCacheError::config(format!(
                "unknown objective '{}'",
                other
            ))),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> ParCacheResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ParCacheResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Creates default configuration.
    pub fn default_config() -> Self {
        Self {
            general: GeneralConfig::default(),
            pool: PoolConfig::default(),
            optimizer: OptimizerConfig::default(),
            objective: ObjectiveConfig::default(),
        }
    }

    /// Loads `path` if it exists, otherwise returns the default configuration.
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> ParCacheResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default_config())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParCacheError;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default_config();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.pool.threads, 0);
        assert_eq!(config.optimizer.initial_step, 0.5);
        assert!(!config.optimizer.use_expansion);
        assert_eq!(config.objective.kind, ObjectiveKind::Sphere);
        assert_eq!(config.objective.dimension, 2);
    }

    #[test]
    fn test_effective_threads() {
        let explicit = PoolConfig { threads: 3 };
        assert_eq!(explicit.effective_threads(), 3);

        let auto = PoolConfig::default();
        assert!(auto.effective_threads() >= 1);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [pool]
            threads = 4

            [objective]
            kind = "rosenbrock"
            "#,
        )
        .unwrap();

        assert_eq!(config.pool.threads, 4);
        assert_eq!(config.objective.kind, ObjectiveKind::Rosenbrock);
        assert_eq!(config.objective.dimension, 2);
        assert_eq!(config.optimizer.max_steps, 200);
        assert_eq!(config.optimizer.pattern, PatternKind::Square);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("parcache.toml");

        let mut config = Config::default_config();
        config.optimizer.use_coordinate_search = true;
        config.objective.start = Some(vec![0.1, 0.9]);
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert!(loaded.optimizer.use_coordinate_search);
        assert_eq!(loaded.objective.start, Some(vec![0.1, 0.9]));
    }

    #[test]
    fn test_load_or_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("parcache.toml");

        let missing = Config::load_or_default(&path).unwrap();
        assert_eq!(missing.objective.dimension, 2);

        std::fs::write(&path, "[objective]\ndimension = 5\n").unwrap();
        let present = Config::load_or_default(&path).unwrap();
        assert_eq!(present.objective.dimension, 5);

        std::fs::write(&path, "[objective\n").unwrap();
        assert!(matches!(
            Config::load_or_default(&path),
            Err(ParCacheError::TomlParse(_))
        ));
    }

    #[test]
    fn test_objective_kind_from_str() {
        assert_eq!("Sum".parse::<ObjectiveKind>().unwrap(), ObjectiveKind::Sum);
        assert!("banana".parse::<ObjectiveKind>().is_err());
    }
}
