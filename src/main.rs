mod cli;
mod execute;

use std::process::ExitCode;
use clap::Parser;
use synapse_installer::{Logger, log::DEFAULT_VERBOSITY};
use crate::cli::CLI;
use crate::execute::Session;

fn fatal(log: &Logger, err: anyhow::Error) -> ExitCode {
    log.critical(format!("{err:#}"));
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    let cli = CLI::parse();
    let startup_log = Logger::new(DEFAULT_VERBOSITY, !cli.no_color);
    let session = match Session::load(cli) {
        Ok(session) => session,
        Err(err) => return fatal(&startup_log, err),
    };
    match session.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => fatal(&session.log, err),
    }
}
