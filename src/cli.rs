// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use runway::output::OutputMode;
use runway::state::DEFAULT_STATE_FILE;

#[derive(Parser)]
#[command(name = "runway")]
#[command(about = "Idempotent provisioning of a hosted n8n service")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// State file shared between steps and runs
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_STATE_FILE)]
    pub state_file: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Provision every resource, skipping what already exists
    Up {
        /// Variable overrides for this run, e.g. DB_ACTION=drop REGION=europe-west1
        #[arg(value_name = "KEY=VALUE")]
        overrides: Vec<String>,
    },

    /// Write a runway.yml with the default settings
    Init {
        /// Service name
        #[arg(long)]
        service: Option<String>,

        /// Upstream image to republish
        #[arg(long)]
        image: Option<String>,

        /// Overwrite an existing runway.yml
        #[arg(short, long)]
        force: bool,
    },

    /// Show the recorded state with secrets masked
    State,

    /// Show recent logs of the deployed service
    Logs {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = 50)]
        limit: u32,
    },
}
