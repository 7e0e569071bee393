//! modgraph CLI binary.
//!
//! Entry point for the `modgraph` command-line tool. It initializes logging
//! via `tracing`, parses arguments with `clap`, dispatches to a command
//! handler and maps the outcome to an exit code.

mod cli;
mod commands;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match commands::dispatch(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            commands::print_error(&report);
            ExitCode::FAILURE
        }
    }
}
