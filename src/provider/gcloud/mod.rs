// ABOUTME: Provider implementation that drives the gcloud CLI.
// ABOUTME: Every call is scoped to the project selected with use_project.

mod args;
mod build;
mod command;

pub use command::{CommandOutput, GcloudCli, classify};

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;

use crate::provider::{
    BuildOps, BuildRequest, Description, IamOps, LogLine, LogOps, ProjectOps, ProviderError,
    ResourceDescriptor, ResourceOps, ResourceSpec, RoleBinding, RunOps, SecretOps,
    SecretVersion, ServiceSpec, ServiceUsageOps,
};

/// Provider backed by the `gcloud` executable on PATH.
#[derive(Debug)]
pub struct GcloudProvider {
    cli: GcloudCli,
    project: Mutex<Option<String>>,
    identity: Mutex<Option<(String, String)>>,
}

impl Default for GcloudProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GcloudProvider {
    pub fn new() -> Self {
        Self::with_program("gcloud")
    }

    /// Use a different executable, e.g. a wrapper script.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            cli: GcloudCli::new(program),
            project: Mutex::new(None),
            identity: Mutex::new(None),
        }
    }

    pub fn project(&self) -> Option<String> {
        self.project.lock().clone()
    }

    fn scoped(&self, mut args: Vec<String>) -> Vec<String> {
        if let Some(project) = self.project.lock().as_deref() {
            args.push(format!("--project={}", project));
        }
        args
    }

    async fn call(&self, args: Vec<String>, subject: &str) -> Result<String, ProviderError> {
        self.cli.run_checked(&self.scoped(args), None, subject).await
    }

    async fn call_json(&self, args: Vec<String>, subject: &str) -> Result<Description, ProviderError> {
        let stdout = self.call(args, subject).await?;
        parse_json(&stdout, subject)
    }
}

fn parse_json(stdout: &str, subject: &str) -> Result<Description, ProviderError> {
    serde_json::from_str(stdout)
        .map_err(|e| ProviderError::InvalidOutput(format!("{}: {}", subject, e)))
}

/// First element of a list lookup; an empty list means the resource is absent.
fn first_listed(list: Description, subject: &str) -> Result<Description, ProviderError> {
    match list {
        serde_json::Value::Array(items) => items
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NotFound(subject.to_string())),
        other => Err(ProviderError::InvalidOutput(format!(
            "{}: expected a list, got {}",
            subject, other
        ))),
    }
}

/// Version number from a name like `projects/1/secrets/s/versions/4`.
fn parse_secret_version(stdout: &str, subject: &str) -> Result<SecretVersion, ProviderError> {
    stdout
        .trim()
        .rsplit('/')
        .next()
        .and_then(|v| v.parse::<u64>().ok())
        .map(SecretVersion)
        .ok_or_else(|| {
            ProviderError::InvalidOutput(format!(
                "{}: unexpected version name {:?}",
                subject,
                stdout.trim()
            ))
        })
}

// =============================================================================
// ResourceOps
// =============================================================================

#[async_trait]
impl ResourceOps for GcloudProvider {
    async fn describe(&self, resource: &ResourceDescriptor) -> Result<Description, ProviderError> {
        let subject = resource.to_string();
        let value = self.call_json(args::describe(resource)?, &subject).await?;
        if args::describe_is_list(resource.kind) {
            first_listed(value, &subject)
        } else {
            Ok(value)
        }
    }

    async fn create(&self, spec: &ResourceSpec) -> Result<(), ProviderError> {
        let subject = spec.descriptor().to_string();
        tracing::info!("creating {}", subject);
        self.call(args::create(spec), &subject).await?;
        Ok(())
    }

    async fn delete(&self, resource: &ResourceDescriptor) -> Result<(), ProviderError> {
        let subject = resource.to_string();
        tracing::info!("deleting {}", subject);
        self.call(args::delete(resource)?, &subject).await?;
        Ok(())
    }
}

// =============================================================================
// ServiceUsageOps, SecretOps, IamOps
// =============================================================================

#[async_trait]
impl ServiceUsageOps for GcloudProvider {
    async fn list_enabled_services(&self) -> Result<Vec<String>, ProviderError> {
        let stdout = self
            .call(args::list_enabled_services(), "enabled services")
            .await?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn enable_services(&self, services: &[String]) -> Result<(), ProviderError> {
        if services.is_empty() {
            return Ok(());
        }
        self.call(args::enable_services(services), "enable services")
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SecretOps for GcloudProvider {
    async fn add_secret_version(
        &self,
        secret: &str,
        value: &[u8],
    ) -> Result<SecretVersion, ProviderError> {
        let subject = format!("secret {}", secret);
        let args = self.scoped(args::add_secret_version(secret));
        let stdout = self.cli.run_checked(&args, Some(value), &subject).await?;
        parse_secret_version(&stdout, &subject)
    }
}

#[async_trait]
impl IamOps for GcloudProvider {
    async fn grant_role(&self, binding: &RoleBinding) -> Result<(), ProviderError> {
        let subject = format!("grant {} to {}", binding.role, binding.member);
        self.call(args::grant_role(binding), &subject).await?;
        Ok(())
    }
}

// =============================================================================
// BuildOps, RunOps, LogOps
// =============================================================================

#[async_trait]
impl BuildOps for GcloudProvider {
    async fn build_and_push(&self, request: &BuildRequest) -> Result<(), ProviderError> {
        let config = build::write_config(request)?;
        let subject = format!("build {}", request.target);
        tracing::info!("submitting {}", subject);
        self.call(args::submit_build(config.path(), &request.region), &subject)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RunOps for GcloudProvider {
    async fn deploy_service(&self, spec: &ServiceSpec) -> Result<(), ProviderError> {
        let subject = format!("service {}", spec.name);
        self.call(args::deploy_service(spec)?, &subject).await?;
        Ok(())
    }

    async fn update_service_env(
        &self,
        name: &str,
        region: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<(), ProviderError> {
        let subject = format!("service {}", name);
        self.call(args::update_service_env(name, region, env)?, &subject)
            .await?;
        Ok(())
    }

    async fn service_url(&self, name: &str, region: &str) -> Result<Option<String>, ProviderError> {
        let subject = format!("service {}", name);
        let stdout = self.call(args::service_url(name, region), &subject).await?;
        let url = stdout.trim();
        Ok((!url.is_empty()).then(|| url.to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogEntry {
    timestamp: Option<String>,
    severity: Option<String>,
    text_payload: Option<String>,
    json_payload: Option<serde_json::Value>,
}

impl LogEntry {
    fn into_line(self) -> LogLine {
        let message = match (self.text_payload, self.json_payload) {
            (Some(text), _) => text,
            (None, Some(json)) => json
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| json.to_string()),
            (None, None) => String::new(),
        };
        LogLine {
            timestamp: self.timestamp,
            severity: self.severity,
            message,
        }
    }
}

fn parse_log_entries(stdout: &str) -> Result<Vec<LogLine>, ProviderError> {
    let entries: Vec<LogEntry> = serde_json::from_str(stdout)
        .map_err(|e| ProviderError::InvalidOutput(format!("log entries: {}", e)))?;
    // Newest first from the API; print oldest first.
    Ok(entries.into_iter().rev().map(LogEntry::into_line).collect())
}

#[async_trait]
impl LogOps for GcloudProvider {
    async fn read_logs(
        &self,
        service: &str,
        region: &str,
        limit: u32,
    ) -> Result<Vec<LogLine>, ProviderError> {
        let stdout = self
            .call(args::read_logs(service, region, limit), "log entries")
            .await?;
        parse_log_entries(&stdout)
    }
}

// =============================================================================
// ProjectOps
// =============================================================================

#[async_trait]
impl ProjectOps for GcloudProvider {
    async fn preflight(&self) -> Result<(), ProviderError> {
        match self.cli.run(&args::version(), None).await {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => Err(ProviderError::Unsupported(format!(
                "{} --version exited with {:?}",
                self.cli.program(),
                output.exit_code
            ))),
            Err(ProviderError::Spawn { program, source })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Err(ProviderError::Unsupported(format!(
                    "{} is not installed or not on PATH",
                    program
                )))
            }
            Err(e) => Err(e),
        }
    }

    async fn active_project(&self) -> Result<Option<String>, ProviderError> {
        let output = self.cli.run(&args::active_project(), None).await?;
        if !output.success() {
            return Ok(None);
        }
        let project = output.stdout.trim();
        Ok((!project.is_empty() && project != "(unset)").then(|| project.to_string()))
    }

    fn use_project(&self, project: &str) {
        let mut current = self.project.lock();
        if current.as_deref() != Some(project) {
            tracing::debug!("scoping provider calls to project {}", project);
            *current = Some(project.to_string());
        }
    }

    async fn default_service_identity(&self) -> Result<String, ProviderError> {
        let project = self
            .project()
            .ok_or_else(|| ProviderError::Other("no project selected".to_string()))?;

        if let Some((cached_for, identity)) = self.identity.lock().as_ref()
            && *cached_for == project
        {
            return Ok(identity.clone());
        }

        let subject = format!("project {}", project);
        let stdout = self
            .cli
            .run_checked(&args::project_number(&project), None, &subject)
            .await?;
        let number = stdout.trim();
        if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
            return Err(ProviderError::InvalidOutput(format!(
                "{}: unexpected project number {:?}",
                subject, number
            )));
        }

        let identity = format!("{}-compute@developer.gserviceaccount.com", number);
        *self.identity.lock() = Some((project, identity.clone()));
        Ok(identity)
    }
}
