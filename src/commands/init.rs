// ABOUTME: Init command implementation.
// ABOUTME: Scaffolds runway.yml in the current directory.

use runway::config::{self, CONFIG_FILENAME};
use runway::error::Result;
use runway::output::Output;

pub fn init(service: Option<&str>, image: Option<&str>, force: bool, output: &Output) -> Result<()> {
    let cwd = std::env::current_dir()?;
    config::init_config(&cwd, service, image, force)?;
    output.success(&format!("Created {}", CONFIG_FILENAME));
    Ok(())
}
