//! # Component Runtime Daemon
//!
//! Main entry point for the runtime host.

use clap::Parser;
use runtimed::{init_logging, run_demo, Runtime, RuntimeConfig, RuntimeError};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "runtimed")]
#[command(about = "Component runtime host", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Process name, overrides the configuration file
    #[arg(short, long)]
    process: Option<String>,

    /// Number of demo cycles to run
    #[arg(long, default_value_t = 10)]
    cycles: usize,

    /// Log filter, overrides the configuration file
    #[arg(long)]
    log_filter: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), RuntimeError> {
    let mut config = match &cli.config {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::default(),
    };
    if let Some(process) = cli.process {
        config.process_name = process;
    }
    if let Some(filter) = cli.log_filter {
        config.log_filter = filter;
    }
    config.validate()?;
    init_logging(&config.log_filter)?;

    let runtime = Runtime::new(config)?;
    let report = run_demo(&runtime, cli.cycles)?;
    println!("{}", report);
    runtime.shutdown()
}
