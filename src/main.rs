mod cli;

use std::process::ExitCode;

use clap::Parser;

use crate::cli::{exit_code, run, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let result = run(cli);
    if let Err(err) = &result {
        eprintln!("Error: {:#}", err);
    }
    exit_code(&result)
}
