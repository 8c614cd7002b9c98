//! runw entry point.

use std::process::ExitCode;

use clap::Parser;

use runw_cli::{Cli, logging, run};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // On success `run` never returns: the process has become the sandbox.
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
