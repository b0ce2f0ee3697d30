//! route-ads binary entry point.

use std::process::ExitCode;

use clap::Parser;
use jobrouter_route_ads::{error, logging, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.config.log_level, cli.config.log_format) {
        error::print_error(&e);
        return ExitCode::FAILURE;
    }

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error::print_error(&e);
            ExitCode::FAILURE
        }
    }
}
