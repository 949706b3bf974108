//! Command line interface for parcache.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::types::config::ObjectiveKind;

/// parcache - parallel function-evaluation cache and pattern search optimizer.
#[derive(Parser, Debug)]
#[command(name = "parcache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = "parcache.toml")]
    pub config: PathBuf,

    /// Verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print errors.
    #[arg(short, long)]
    pub quiet: bool,

    /// Command to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Writes a default configuration file.
    Init {
        /// Target directory (default: current directory).
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Minimizes a built-in objective with the multidirectional search.
    Optimize {
        /// Objective (sphere, rosenbrock, sum).
        #[arg(short, long)]
        objective: Option<ObjectiveKind>,

        /// Dimension of the search space.
        #[arg(short, long)]
        dimension: Option<usize>,

        /// Worker threads (0 = available parallelism).
        #[arg(short, long)]
        threads: Option<usize>,

        /// Maximum number of steps.
        #[arg(long)]
        max_steps: Option<usize>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Evaluates a built-in objective at one point.
    Evaluate {
        /// Comma separated coordinates, e.g. `0.2,0.3`.
        #[arg(short, long)]
        point: String,

        /// Objective (sphere, rosenbrock, sum).
        #[arg(short, long)]
        objective: Option<ObjectiveKind>,
    },

    /// Shows the version.
    Version,
}
