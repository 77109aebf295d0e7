// ABOUTME: Service step: access grants, admin credential, and the two-pass deploy.
// ABOUTME: Each stage is persisted so an interrupted run resumes instead of redeploying.

mod deployment;
mod state;
mod transitions;

pub use deployment::{Resumed, ServiceDeployment, resume};
pub use state::{AddressKnown, Configured, Created, Pending};
pub use transitions::address_env;

use std::collections::BTreeMap;

use async_trait::async_trait;
use snafu::ResultExt;

use crate::config::ActionMode;
use crate::provider::{
    BindingScope, ResourceDescriptor, ResourceKind, ResourceSpec, RoleBinding, SecretRef,
    ServiceSpec,
};
use crate::reconcile::Presence;
use crate::state::{DeployStage, StateKey};

use super::credentials::{ADMIN_PASSWORD_LEN, generate_password};
use super::error::{ProviderSnafu, StepError};
use super::secrets::write_secret;
use super::{Step, StepContext};

const SECRET_ACCESSOR_ROLE: &str = "roles/secretmanager.secretAccessor";
const SQL_CLIENT_ROLE: &str = "roles/cloudsql.client";

/// Environment variables bound to secrets. Never set as plain values.
pub const DB_PASSWORD_VAR: &str = "DB_POSTGRESDB_PASSWORD";
pub const ENCRYPTION_KEY_VAR: &str = "N8N_ENCRYPTION_KEY";
pub const ADMIN_PASSWORD_VAR: &str = "N8N_BASIC_AUTH_PASSWORD";

pub struct ServiceStep;

#[async_trait]
impl Step for ServiceStep {
    fn name(&self) -> &'static str {
        "service"
    }

    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        let spec = service_spec(ctx)?;
        let record = ctx.record()?;

        let mut resumed = resume(spec, record.deploy_stage, record.service_url);
        if resumed.is_resuming() {
            // Recorded progress only counts if the service is still there.
            let service =
                ResourceDescriptor::new(ResourceKind::RunService, ctx.settings.service.as_str())
                    .with_location(ctx.region());
            if ctx.reconciler().observe(&service).await? == Presence::Absent {
                tracing::warn!(
                    "{} is recorded as deployed but does not exist, deploying again",
                    service
                );
                resumed = Resumed::Pending(resumed.restart());
            }
        }

        let created = match resumed {
            Resumed::Pending(pending) => {
                grant_runtime_access(ctx).await?;
                rotate_admin_password(ctx).await?;

                ctx.output
                    .progress(&format!("Deploying service {}", pending.spec().name));
                let created = pending.deploy(ctx.provider).await?;
                ctx.save(StateKey::DeployStage, DeployStage::Created.as_str())?;
                created
            }
            Resumed::Created(created) => {
                tracing::info!("resuming deployment of {} after deploy", created.spec().name);
                created
            }
            Resumed::AddressKnown(known) => {
                tracing::info!("resuming deployment of {} at {}", known.spec().name, known.url());
                return configure(ctx, known).await;
            }
        };

        let known = created.fetch_address(ctx.provider).await?;
        ctx.save(StateKey::ServiceUrl, known.url())?;
        ctx.save(StateKey::DeployStage, DeployStage::AddressKnown.as_str())?;

        configure(ctx, known).await
    }
}

async fn configure(
    ctx: &mut StepContext<'_>,
    known: ServiceDeployment<AddressKnown>,
) -> Result<(), StepError> {
    let configured = known.configure(ctx.provider).await?;
    ctx.save(StateKey::DeployStage, DeployStage::Configured.as_str())?;
    ctx.output.value(StateKey::ServiceUrl.as_str(), configured.url());
    Ok(())
}

/// Build the deploy request from settings and values recorded by earlier steps.
fn service_spec(ctx: &StepContext<'_>) -> Result<ServiceSpec, StepError> {
    let settings = ctx.settings;
    let record = ctx.record()?;

    let image = record
        .image_url
        .ok_or_else(|| StepError::MissingPrecondition {
            what: StateKey::ImageUrl.to_string(),
            remedy: "run the image step first".to_string(),
        })?;
    let connection = ctx.require(
        StateKey::DbConnectionName,
        "run the database step first",
    )?;
    let connector = ctx
        .get(StateKey::ConnectorName)
        .map(str::to_string)
        .unwrap_or_else(|| settings.network.connector.to_string());

    let db = &settings.database;
    let mut env = BTreeMap::new();
    env.insert("DB_TYPE".to_string(), "postgresdb".to_string());
    env.insert("DB_POSTGRESDB_HOST".to_string(), format!("/cloudsql/{}", connection));
    env.insert("DB_POSTGRESDB_PORT".to_string(), "5432".to_string());
    env.insert("DB_POSTGRESDB_DATABASE".to_string(), db.name.clone());
    env.insert("DB_POSTGRESDB_USER".to_string(), db.user.clone());
    env.insert("N8N_PORT".to_string(), settings.run.port.to_string());
    env.insert("N8N_BASIC_AUTH_ACTIVE".to_string(), "true".to_string());
    env.insert("N8N_BASIC_AUTH_USER".to_string(), settings.run.admin_user.clone());
    env.extend(settings.run.env.clone());

    let names = &settings.secrets;
    let mut secrets = BTreeMap::new();
    secrets.insert(DB_PASSWORD_VAR.to_string(), SecretRef::latest(names.db_password.as_str()));
    secrets.insert(ENCRYPTION_KEY_VAR.to_string(), SecretRef::latest(names.encryption_key.as_str()));
    secrets.insert(ADMIN_PASSWORD_VAR.to_string(), SecretRef::latest(names.admin_password.as_str()));

    for key in secrets.keys() {
        if env.remove(key).is_some() {
            tracing::debug!("{} is bound to a secret, ignoring its plain value", key);
        }
    }

    Ok(ServiceSpec {
        name: settings.service.to_string(),
        region: ctx.region(),
        image,
        port: settings.run.port,
        connector: Some(connector),
        sql_instance: Some(connection),
        env,
        secrets,
        memory: settings.run.memory.clone(),
        cpu: settings.run.cpu.clone(),
        min_instances: settings.run.min_instances,
        max_instances: settings.run.max_instances,
        service_account: settings.run.service_account.clone(),
        allow_unauthenticated: settings.run.allow_unauthenticated,
    })
}

/// Grant the runtime identity access to every secret and the database before deploying.
async fn grant_runtime_access(ctx: &mut StepContext<'_>) -> Result<(), StepError> {
    let settings = ctx.settings;
    let project = ctx.project()?;

    let identity = match &settings.run.service_account {
        Some(account) => account.clone(),
        None => ctx
            .provider
            .default_service_identity()
            .await
            .context(ProviderSnafu {
                action: "look up the default runtime identity",
            })?,
    };
    let member = format!("serviceAccount:{}", identity);

    let names = &settings.secrets;
    let mut bindings: Vec<RoleBinding> = [
        &names.db_password,
        &names.encryption_key,
        &names.admin_password,
    ]
    .into_iter()
    .map(|secret| RoleBinding {
        scope: BindingScope::Secret(secret.to_string()),
        member: member.clone(),
        role: SECRET_ACCESSOR_ROLE.to_string(),
    })
    .collect();
    bindings.push(RoleBinding {
        scope: BindingScope::Project(project),
        member: member.clone(),
        role: SQL_CLIENT_ROLE.to_string(),
    });

    // The admin secret must exist before access to it can be granted.
    ctx.reconciler()
        .ensure_present(
            &ResourceSpec::Secret {
                name: names.admin_password.to_string(),
            },
            ActionMode::Ignore,
        )
        .await?;

    for binding in &bindings {
        ctx.provider
            .grant_role(binding)
            .await
            .context(ProviderSnafu {
                action: format!("grant {} to {}", binding.role, binding.member),
            })?;
    }
    tracing::info!("granted runtime access to {}", member);
    Ok(())
}

/// Store a new admin password as a secret version and show it once.
async fn rotate_admin_password(ctx: &mut StepContext<'_>) -> Result<(), StepError> {
    let settings = ctx.settings;
    let password = generate_password(ADMIN_PASSWORD_LEN);
    write_secret(ctx, settings.secrets.admin_password.as_str(), password.as_bytes()).await?;
    ctx.output.secret(
        &format!("Admin password for user {}", settings.run.admin_user),
        &password,
    );
    Ok(())
}
