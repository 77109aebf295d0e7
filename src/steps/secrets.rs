// ABOUTME: Secrets step: database password and a fresh application encryption key.
// ABOUTME: Every write appends a new secret version; the key never touches the state file.

use async_trait::async_trait;
use snafu::ResultExt;

use crate::config::ActionMode;
use crate::provider::{ResourceSpec, SecretVersion};
use crate::state::StateKey;

use super::credentials::generate_encryption_key;
use super::error::{ProviderSnafu, StepError};
use super::{Step, StepContext};

pub struct SecretsStep;

#[async_trait]
impl Step for SecretsStep {
    fn name(&self) -> &'static str {
        "secrets"
    }

    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        let settings = ctx.settings;
        let names = &settings.secrets;

        let password = ctx.require(
            StateKey::DbPassword,
            "run the database step first or pass DB_PASSWORD=...",
        )?;
        write_secret(ctx, names.db_password.as_str(), password.as_bytes()).await?;

        let key = generate_encryption_key();
        write_secret(ctx, names.encryption_key.as_str(), key.as_bytes()).await?;
        Ok(())
    }
}

/// Ensure the secret exists, then append `value` as a new version.
pub(crate) async fn write_secret(
    ctx: &mut StepContext<'_>,
    name: &str,
    value: &[u8],
) -> Result<SecretVersion, StepError> {
    ctx.reconciler()
        .ensure_present(
            &ResourceSpec::Secret {
                name: name.to_string(),
            },
            ActionMode::Ignore,
        )
        .await?;

    let version = ctx
        .provider
        .add_secret_version(name, value)
        .await
        .context(ProviderSnafu {
            action: format!("add a version to secret {}", name),
        })?;

    tracing::info!("secret {} is now at version {}", name, version);
    Ok(version)
}
