use clap::Parser;
use parcache::cli::commands::{self, OptimizeOptions};
use parcache::cli::{Cli, Commands};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// The cache drives its own runtime with `block_on`, so main stays synchronous.
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration first (no logging yet)
    let config = commands::load_config(&cli.config);

    // CLI flags take precedence over config
    let log_level = if cli.quiet {
        "error".to_string()
    } else if cli.verbose {
        "debug".to_string()
    } else {
        config.general.log_level.clone()
    };

    let filter = EnvFilter::from_default_env().add_directive(
        format!("parcache={}", log_level)
            .parse()
            .unwrap_or_else(|_| "parcache=info".parse().expect("fallback directive is valid")),
    );

    let json = config.general.log_format.eq_ignore_ascii_case("json");
    tracing_subscriber::registry()
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .with(filter)
        .init();

    tracing::debug!("Configuration loaded from: {}", cli.config.display());

    match cli.command {
        Commands::Init { path } => {
            commands::init(path)?;
        }
        Commands::Optimize {
            objective,
            dimension,
            threads,
            max_steps,
            json,
        } => {
            let options = OptimizeOptions {
                objective,
                dimension,
                threads,
                max_steps,
                json,
            };
            commands::optimize(options, &config)?;
        }
        Commands::Evaluate { point, objective } => {
            commands::evaluate(&point, objective, &config)?;
        }
        Commands::Version => {
            commands::version();
        }
    }

    Ok(())
}
