// ABOUTME: Logs command implementation.
// ABOUTME: Prints recent log entries of the deployed service.

use std::path::Path;

use runway::error::{Error, Result};
use runway::output::Output;
use runway::provider::{GcloudProvider, LogOps, ProjectOps};
use runway::state::StateKey;

pub async fn logs(limit: u32, state_file: &Path, output: &Output) -> Result<()> {
    let (_, vars, settings) = super::load(state_file, Vec::new())?;

    let provider = GcloudProvider::new();
    provider.preflight().await?;

    let project = match vars.get(StateKey::ProjectId.as_str()) {
        Some(project) => project.to_string(),
        None => provider
            .active_project()
            .await?
            .ok_or_else(|| Error::MissingEnvVar(StateKey::ProjectId.to_string()))?,
    };
    provider.use_project(&project);

    let region = vars.get_or(StateKey::Region.as_str(), &settings.default_region);
    let lines = provider
        .read_logs(settings.service.as_str(), region, limit)
        .await?;

    if lines.is_empty() {
        output.progress(&format!("No log entries for {}", settings.service));
    }
    for line in &lines {
        output.line(&line.to_string());
    }
    Ok(())
}
