//! Binary entry point: parse the command line, initialize logging, run the
//! pipeline. A missing footprint file is a usage error and exits with code 1
//! after a readable message instead of a backtrace.
use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use astrodiff::astrodiff_errors::AstrodiffError;
use astrodiff::cli::{Cli, Config};
use astrodiff::env_state::AstrodiffEnv;
use astrodiff::runner;

fn init_tracing(debug: bool, verbose: bool) {
    let default_level = if debug {
        "astrodiff=debug"
    } else if verbose {
        "astrodiff=info"
    } else {
        "astrodiff=warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug, cli.verbose);

    let config = Config::from_cli(cli).context("invalid configuration")?;
    let env = AstrodiffEnv::new();

    match runner::run(&env, &config) {
        Ok(summary) => {
            println!(
                "done: {} written, {} skipped, {} failed, {} stacked rows",
                summary.written, summary.skipped, summary.failed, summary.stacked_rows
            );
            Ok(())
        }
        Err(AstrodiffError::FootprintNotFound(path)) => {
            eprintln!("footprint file not found: {path}");
            std::process::exit(1);
        }
        Err(err) => Err(err).context("pipeline failed"),
    }
}
