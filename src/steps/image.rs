// ABOUTME: Image step: republish the upstream image into the project's registry.
// ABOUTME: Runs a remote build and records the published reference for the service step.

use async_trait::async_trait;
use snafu::ResultExt;

use crate::config::ActionMode;
use crate::provider::{BuildRequest, ResourceSpec};
use crate::state::StateKey;

use super::error::{ProviderSnafu, StepError};
use super::{Step, StepContext};

pub struct ImageStep;

/// `<region>-docker.pkg.dev/<project>/<repository>`
pub fn registry_path(region: &str, project: &str, repository: &str) -> String {
    format!("{}-docker.pkg.dev/{}/{}", region, project, repository)
}

#[async_trait]
impl Step for ImageStep {
    fn name(&self) -> &'static str {
        "image"
    }

    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        let settings = ctx.settings;
        let project = ctx.project()?;
        let region = ctx.region();
        let repository = settings.registry.repository.as_str();

        ctx.reconciler()
            .ensure_present(
                &ResourceSpec::ArtifactRepo {
                    name: repository.to_string(),
                    region: region.clone(),
                },
                ActionMode::Ignore,
            )
            .await?;

        let source = settings.upstream_image.clone();
        let target = source
            .republished_under(&registry_path(&region, &project, repository))
            .map_err(|e| StepError::InvalidInput {
                message: format!("cannot derive published image name: {}", e),
            })?;

        ctx.output
            .progress(&format!("Publishing {} as {}", source, target));
        ctx.provider
            .build_and_push(&BuildRequest {
                region,
                source,
                target: target.clone(),
            })
            .await
            .context(ProviderSnafu {
                action: format!("publish {}", target),
            })?;

        ctx.save(StateKey::ImageUrl, &target.to_string())?;
        Ok(())
    }
}
