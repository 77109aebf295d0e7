// ABOUTME: Command module aggregator for the runway CLI.
// ABOUTME: Re-exports up, init, state, and logs command handlers.

mod init;
mod logs;
mod state;
mod up;

pub use init::init;
pub use logs::logs;
pub use state::show_state;
pub use up::up;

use std::path::Path;

use runway::config::{FileConfig, Settings, Vars};
use runway::error::Result;
use runway::state::StateStore;

/// Load the state file and resolve settings from every layer.
fn load(state_file: &Path, overrides: Vec<(String, String)>) -> Result<(StateStore, Vars, Settings)> {
    let store = StateStore::load(state_file)?;
    let vars = Vars::from_process_env()
        .with_state(&store)
        .with_overrides(overrides);
    let cwd = std::env::current_dir()?;
    let settings = Settings::resolve(&FileConfig::discover(&cwd)?, &vars)?;
    Ok((store, vars, settings))
}
