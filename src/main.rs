//! Main entry point for keydiff CLI

use clap::Parser;
use keydiff::cli::Cli;
use keydiff::commands::execute_command;

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    if let Err(e) = execute_command(cli.command, cli.config.as_deref(), cli.quiet) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
