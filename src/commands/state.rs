// ABOUTME: State command implementation.
// ABOUTME: Lists recorded values, masking credential material.

use std::path::Path;

use runway::error::Result;
use runway::output::Output;
use runway::state::{StateKey, StateStore};

const MASK: &str = "********";

pub fn show_state(state_file: &Path, output: &Output) -> Result<()> {
    let store = StateStore::load(state_file)?;

    if store.is_empty() {
        output.progress(&format!("No state recorded in {}", state_file.display()));
        return Ok(());
    }

    for (key, value) in store.entries() {
        let secret = StateKey::from_name(key).is_some_and(|k| k.is_secret());
        output.value(key, if secret { MASK } else { value });
    }
    Ok(())
}
