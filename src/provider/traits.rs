// ABOUTME: Composable capability traits for cloud providers.
// ABOUTME: Provider is the blanket union the pipeline programs against.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::error::ProviderError;
use super::resource::{ResourceDescriptor, ResourceSpec};
use super::shared_types::{
    BuildRequest, Description, LogLine, RoleBinding, SecretVersion, ServiceSpec,
};

/// Describe, create, and delete individual resources.
#[async_trait]
pub trait ResourceOps: Send + Sync {
    /// Look up a resource. Absence is reported as [`ProviderError::NotFound`].
    async fn describe(&self, resource: &ResourceDescriptor) -> Result<Description, ProviderError>;

    /// Create a resource. Blocks until the provider reports completion.
    async fn create(&self, spec: &ResourceSpec) -> Result<(), ProviderError>;

    /// Delete a resource.
    async fn delete(&self, resource: &ResourceDescriptor) -> Result<(), ProviderError>;
}

/// Enable provider APIs for the project.
#[async_trait]
pub trait ServiceUsageOps: Send + Sync {
    async fn list_enabled_services(&self) -> Result<Vec<String>, ProviderError>;

    /// Enabling an already-enabled service is a no-op on the provider side.
    async fn enable_services(&self, services: &[String]) -> Result<(), ProviderError>;
}

/// Append secret versions.
#[async_trait]
pub trait SecretOps: Send + Sync {
    /// Add a new version to an existing secret. Earlier versions are kept.
    async fn add_secret_version(
        &self,
        secret: &str,
        value: &[u8],
    ) -> Result<SecretVersion, ProviderError>;
}

/// Grant IAM roles.
#[async_trait]
pub trait IamOps: Send + Sync {
    async fn grant_role(&self, binding: &RoleBinding) -> Result<(), ProviderError>;
}

/// Remote image builds.
#[async_trait]
pub trait BuildOps: Send + Sync {
    /// Pull, tag, and push `request.source` as `request.target`. Blocks until the build ends.
    async fn build_and_push(&self, request: &BuildRequest) -> Result<(), ProviderError>;
}

/// Serverless service deployment.
#[async_trait]
pub trait RunOps: Send + Sync {
    async fn deploy_service(&self, spec: &ServiceSpec) -> Result<(), ProviderError>;

    /// Add or replace plain environment variables on a deployed service.
    async fn update_service_env(
        &self,
        name: &str,
        region: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<(), ProviderError>;

    /// Externally visible address of the service, if it has one yet.
    async fn service_url(&self, name: &str, region: &str) -> Result<Option<String>, ProviderError>;
}

/// Recent service logs.
#[async_trait]
pub trait LogOps: Send + Sync {
    async fn read_logs(
        &self,
        service: &str,
        region: &str,
        limit: u32,
    ) -> Result<Vec<LogLine>, ProviderError>;
}

/// Project selection and invocation checks.
#[async_trait]
pub trait ProjectOps: Send + Sync {
    /// Verify the provider can be driven from this process at all.
    async fn preflight(&self) -> Result<(), ProviderError>;

    /// Project configured as the provider's default, if any.
    async fn active_project(&self) -> Result<Option<String>, ProviderError>;

    /// Scope every subsequent call to `project`.
    fn use_project(&self, project: &str);

    /// Identity the deployed service runs as when none is configured.
    async fn default_service_identity(&self) -> Result<String, ProviderError>;
}

/// Everything the pipeline needs from a provider.
pub trait Provider:
    ResourceOps + ServiceUsageOps + SecretOps + IamOps + BuildOps + RunOps + LogOps + ProjectOps
{
}

impl<T> Provider for T where
    T: ResourceOps
        + ServiceUsageOps
        + SecretOps
        + IamOps
        + BuildOps
        + RunOps
        + LogOps
        + ProjectOps
{
}
