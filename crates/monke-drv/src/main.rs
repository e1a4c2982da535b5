mod cli;
mod error;
mod repl;

use clap::Parser as _;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;
use error::DriverError;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.file {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .map_err(|e| DriverError::ReadFile(path.clone(), e))?;
            repl::run_file(&source, cli.mode)
        }
        None => repl::run_repl(cli.mode),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}
