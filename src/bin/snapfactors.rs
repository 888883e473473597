//! Command-line entry point for the factor engine.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snapfactors::{EngineError, Overrides, Settings};

/// Batch cross-sectional order-book factor engine.
#[derive(Parser)]
#[command(name = "snapfactors")]
#[command(about = "Compute cross-sectional order-book factors from Level-10 snapshot archives")]
#[command(version = snapfactors::VERSION)]
struct Args {
    /// Root of the `<MMDD>/<stock>/snapshot.csv` input tree.
    #[arg(long, env = "SNAPFACTORS_INPUT")]
    input: PathBuf,

    /// Directory `<MMDD>.csv` output files are written into.
    #[arg(long, env = "SNAPFACTORS_OUTPUT")]
    output: PathBuf,

    /// Worker parallelism hint; clamped to the configured maximum.
    #[arg(long, env = "SNAPFACTORS_PARALLELISM")]
    parallelism: Option<usize>,

    /// Path to a TOML config file overriding the built-in defaults.
    #[arg(long, env = "SNAPFACTORS_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace), overriding the
    /// configured default filter.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Map a repeated `-v` count to a tracing filter directive, matching the
/// configured default (`info`) at zero occurrences.
fn verbosity_filter(count: u8) -> Option<&'static str> {
    match count {
        0 => None,
        1 => Some("debug"),
        _ => Some("trace"),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let overrides = Overrides {
        config_file: args.config,
        parallelism: args.parallelism,
        log_filter: verbosity_filter(args.verbose).map(str::to_string),
    };

    let settings = match Settings::resolve(args.input, args.output, overrides) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = snapfactors::VERSION, "starting snapfactors");

    match snapfactors::run(&settings) {
        Ok(summary) => {
            tracing::info!(
                committed = summary.days_committed,
                total = summary.days_total,
                "run complete"
            );
            ExitCode::SUCCESS
        }
        Err(err @ EngineError::PartialFailure { .. }) => {
            tracing::error!(error = %err, "run finished with failures");
            ExitCode::FAILURE
        }
        Err(err) => {
            tracing::error!(error = %err, "run failed");
            ExitCode::FAILURE
        }
    }
}
