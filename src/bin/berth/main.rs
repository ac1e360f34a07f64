//! Berth CLI - detect and build optional native add-on modules

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("berth=debug")
    } else {
        EnvFilter::new("berth=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Build(args) => commands::build::execute(&cli.global, args),
        Commands::Detect(args) => commands::detect::execute(&cli.global, args),
        Commands::List(args) => commands::list::execute(&cli.global, args),
        Commands::Toolchain => commands::toolchain::execute(&cli.global),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
