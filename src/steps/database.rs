// ABOUTME: Database step: managed instance, application database, and login user.
// ABOUTME: Credentials are generated only for new instances and refused if missing for existing ones.

use async_trait::async_trait;

use crate::config::ActionMode;
use crate::provider::{ResourceDescriptor, ResourceKind, ResourceSpec};
use crate::reconcile::Presence;
use crate::state::StateKey;

use super::credentials::{DB_PASSWORD_LEN, generate_password};
use super::error::StepError;
use super::{Step, StepContext};

pub struct DatabaseStep;

#[async_trait]
impl Step for DatabaseStep {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        let settings = ctx.settings;
        let db = &settings.database;
        let mode = settings.action_mode;
        let project = ctx.project()?;
        let region = ctx.region();

        let instance = ResourceDescriptor::new(ResourceKind::SqlInstance, db.instance.as_str());

        let mut rec = ctx.reconciler();
        if mode == ActionMode::Destroy {
            rec.destroy(&instance).await;
        }
        let existing = rec.lookup(&instance).await?;
        let presence = if existing.is_some() {
            Presence::Present
        } else {
            Presence::Absent
        };

        let password = match presence {
            Presence::Present => ctx.require(
                StateKey::DbPassword,
                &format!(
                    "instance {} already exists but no password is recorded; pass DB_PASSWORD=... or recreate it with DB_ACTION=destroy",
                    db.instance
                ),
            )?,
            Presence::Absent => {
                let password = generate_password(DB_PASSWORD_LEN);
                // Persist before creating so a failed run never loses it.
                ctx.save(StateKey::DbPassword, &password)?;
                ctx.output.secret("Database password", &password);
                password
            }
        };

        let mut rec = ctx.reconciler();
        rec.ensure_present(
            &ResourceSpec::SqlInstance {
                name: db.instance.to_string(),
                region: region.clone(),
                tier: db.tier.clone(),
                version: db.version.clone(),
                network: settings.network.network.clone(),
            },
            ActionMode::Ignore,
        )
        .await?;

        rec.ensure_absent_then_present(
            &ResourceSpec::SqlDatabase {
                name: db.name.clone(),
                instance: db.instance.to_string(),
            },
            mode,
        )
        .await?;

        rec.ensure_absent_then_present(
            &ResourceSpec::SqlUser {
                name: db.user.clone(),
                instance: db.instance.to_string(),
                password,
            },
            mode,
        )
        .await?;

        ctx.save(StateKey::DbInstance, db.instance.as_str())?;
        ctx.save(StateKey::DbName, &db.name)?;
        ctx.save(StateKey::DbUser, &db.user)?;
        // An existing instance stays where it was created, whatever REGION says now.
        let connection = existing
            .as_ref()
            .and_then(|d| d.get("connectionName"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}:{}:{}", project, region, db.instance));
        ctx.save(StateKey::DbConnectionName, &connection)?;
        Ok(())
    }
}
