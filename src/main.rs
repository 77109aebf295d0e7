// ABOUTME: Entry point for the runway CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use runway::error::Result;
use runway::output::Output;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let mode = cli.output_mode();
    let result = run(cli).await;

    if let Err(e) = result {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let output = Output::new(cli.output_mode());
    let state_file = cli.state_file;

    match cli.command {
        Commands::Up { overrides } => commands::up(&overrides, &state_file, output).await,
        Commands::Init {
            service,
            image,
            force,
        } => commands::init(service.as_deref(), image.as_deref(), force, &output),
        Commands::State => commands::show_state(&state_file, &output),
        Commands::Logs { limit } => commands::logs(limit, &state_file, &output).await,
    }
}
