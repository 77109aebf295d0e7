// ABOUTME: Network step: project and region selection, API enablement, private connectivity.
// ABOUTME: Shared network resources are only ever created, never deleted.

use async_trait::async_trait;
use snafu::ResultExt;

use crate::config::{ActionMode, REQUIRED_SERVICES};
use crate::provider::{ProviderErrorKind, ResourceSpec};
use crate::state::StateKey;

use super::error::{ProviderSnafu, StepError};
use super::{Step, StepContext};

pub struct NetworkStep;

#[async_trait]
impl Step for NetworkStep {
    fn name(&self) -> &'static str {
        "network"
    }

    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        let project = resolve_project(ctx).await?;
        ctx.provider.use_project(&project);
        ctx.save(StateKey::ProjectId, &project)?;

        let region = ctx.region();
        ctx.save(StateKey::Region, &region)?;
        ctx.output
            .progress(&format!("Project {} in {}", project, region));

        let settings = ctx.settings;
        if settings.action_mode.is_destructive() {
            tracing::debug!(
                "{} mode does not apply to shared network resources",
                settings.action_mode
            );
        }

        enable_required_services(ctx).await?;

        let net = &settings.network;
        let shared = [
            ResourceSpec::Network {
                name: net.network.clone(),
            },
            ResourceSpec::AddressReservation {
                name: net.peering_range.to_string(),
                network: net.network.clone(),
                prefix_len: net.peering_prefix_len,
            },
            ResourceSpec::Peering {
                network: net.network.clone(),
                range: net.peering_range.to_string(),
            },
        ];

        let mut rec = ctx.reconciler();
        for spec in &shared {
            rec.ensure_present(spec, ActionMode::Ignore).await?;
        }

        let connector = ResourceSpec::Connector {
            name: net.connector.to_string(),
            region: region.clone(),
            network: net.network.clone(),
            range: net.connector_range,
        };
        match rec.ensure_present(&connector, ActionMode::Ignore).await {
            Ok(_) => {}
            Err(source) if source.kind() == ProviderErrorKind::AddressInUse => {
                return Err(StepError::ConnectorRangeInUse {
                    range: net.connector_range,
                    source,
                });
            }
            Err(e) => return Err(e.into()),
        }

        ctx.save(StateKey::ConnectorName, net.connector.as_str())?;
        ctx.save(StateKey::ConnectorRange, &net.connector_range.to_string())?;
        Ok(())
    }
}

async fn resolve_project(ctx: &StepContext<'_>) -> Result<String, StepError> {
    if let Some(project) = ctx.get(StateKey::ProjectId) {
        return Ok(project.to_string());
    }

    let active = ctx
        .provider
        .active_project()
        .await
        .context(ProviderSnafu {
            action: "read the active project",
        })?;

    active.ok_or_else(|| StepError::MissingPrecondition {
        what: StateKey::ProjectId.to_string(),
        remedy: "set a default project in the provider CLI or pass PROJECT_ID=...".to_string(),
    })
}

/// Enable only the required services that are not already enabled.
async fn enable_required_services(ctx: &StepContext<'_>) -> Result<(), StepError> {
    let enabled = ctx
        .provider
        .list_enabled_services()
        .await
        .context(ProviderSnafu {
            action: "list enabled services",
        })?;

    let missing: Vec<String> = REQUIRED_SERVICES
        .iter()
        .filter(|s| !enabled.iter().any(|e| e == *s))
        .map(|s| s.to_string())
        .collect();

    if missing.is_empty() {
        tracing::info!("all required services already enabled");
        return Ok(());
    }

    ctx.output
        .progress(&format!("Enabling {} services", missing.len()));
    ctx.provider
        .enable_services(&missing)
        .await
        .context(ProviderSnafu {
            action: "enable required services",
        })
}
