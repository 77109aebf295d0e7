// ABOUTME: Up command implementation.
// ABOUTME: Runs the provisioning pipeline against the gcloud provider.

use std::path::Path;

use runway::error::Result;
use runway::output::Output;
use runway::pipeline::{Overrides, Pipeline};
use runway::provider::GcloudProvider;
use runway::state::StateRecord;

pub async fn up(tokens: &[String], state_file: &Path, mut output: Output) -> Result<()> {
    output.start_timer();

    let overrides = Overrides::parse(tokens)?;
    let (mut store, mut vars, settings) = super::load(state_file, overrides.into_iter().collect())?;

    // Reject a corrupt state record before any provider call.
    StateRecord::from_lookup(|k| vars.get(k).map(str::to_string))?;

    let pipeline = Pipeline::from_settings(&settings);
    output.progress(&format!(
        "Provisioning {} ({} mode): {}",
        settings.service,
        settings.action_mode,
        pipeline.step_names().join(", ")
    ));

    let provider = GcloudProvider::new();
    let report = pipeline
        .run(&settings, &mut vars, &mut store, &provider, &output)
        .await?;

    output.success(&format!(
        "Provisioned {}: {} step(s) run, {} skipped, {} warning(s)",
        settings.service,
        report.steps_run.len(),
        report.steps_skipped.len(),
        report.warnings.len()
    ));
    Ok(())
}
