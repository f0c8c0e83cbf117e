use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::lib::cli::{
    commands::{EXIT_USAGE, execute},
    types::Cli,
};

mod lib {
    pub mod agents;
    pub mod cli;
    pub mod client;
    pub mod config;
    pub mod local;
    pub mod tasks;
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // --help and --version come back as errors too
            return if err.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing(cli.debug);

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Encountered Error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
