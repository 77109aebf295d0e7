// ABOUTME: In-memory provider that records every call for pipeline tests.
// ABOUTME: Supports failure injection for range conflicts, missing addresses, and denied deletes.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use runway::provider::{
    BuildOps, BuildRequest, Description, IamOps, LogLine, LogOps, ProjectOps, ProviderError,
    ResourceDescriptor, ResourceKind, ResourceOps, ResourceSpec, RoleBinding, RunOps, SecretOps,
    SecretVersion, ServiceSpec, ServiceUsageOps,
};

/// One recorded provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Describe(String),
    Create(String),
    Delete(String),
    EnableServices(Vec<String>),
    AddSecretVersion(String),
    GrantRole(String),
    Build(String),
    Deploy(String),
    UpdateEnv(String),
    ServiceUrl(String),
    ReadLogs(String),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Call::Describe(_) | Call::ServiceUrl(_) | Call::ReadLogs(_)
        )
    }
}

/// Key identifying a resource regardless of how its descriptor was built.
pub fn key(kind: ResourceKind, name: &str, parent: Option<&str>) -> String {
    match parent {
        Some(parent) => format!("{}:{}/{}", kind, parent, name),
        None => format!("{}:{}", kind, name),
    }
}

fn descriptor_key(d: &ResourceDescriptor) -> String {
    let base = key(d.kind, &d.name, d.parent.as_deref());
    match &d.location {
        Some(location) => format!("{}@{}", base, location),
        None => base,
    }
}

#[derive(Debug, Default)]
pub struct FakeCloud {
    /// Existing resources mapped to a generation number that changes on every create.
    pub resources: BTreeMap<String, u64>,
    pub created: Vec<ResourceSpec>,
    pub user_passwords: BTreeMap<String, String>,
    /// Region each SQL instance was created in, by instance name.
    pub instance_regions: BTreeMap<String, String>,
    pub enabled_services: BTreeSet<String>,
    pub secret_versions: BTreeMap<String, Vec<Vec<u8>>>,
    pub grants: Vec<RoleBinding>,
    pub deployed: Vec<ServiceSpec>,
    pub service_env: BTreeMap<String, BTreeMap<String, String>>,
    pub calls: Vec<Call>,
    pub active_project: Option<String>,
    pub project: Option<String>,
    next_generation: u64,

    pub range_in_use: bool,
    pub no_url: bool,
    pub deny_delete: bool,
    pub unsupported: bool,
}

pub struct FakeProvider {
    cloud: Mutex<FakeCloud>,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeProvider {
    pub fn new() -> Self {
        let cloud = FakeCloud {
            active_project: Some("acme".to_string()),
            ..FakeCloud::default()
        };
        let provider = Self {
            cloud: Mutex::new(cloud),
        };
        // Every project starts with the default network.
        provider.seed(ResourceKind::Network, "default", None);
        provider
    }

    /// Mutate the fake cloud directly.
    pub fn with<T>(&self, f: impl FnOnce(&mut FakeCloud) -> T) -> T {
        f(&mut self.cloud.lock())
    }

    /// Make a resource exist without recording a call.
    pub fn seed(&self, kind: ResourceKind, name: &str, parent: Option<&str>) {
        self.with(|c| {
            c.next_generation += 1;
            let generation = c.next_generation;
            c.resources.insert(key(kind, name, parent), generation);
        });
    }

    /// Make a SQL instance exist in `region` without recording a call.
    pub fn seed_instance(&self, name: &str, region: &str) {
        self.seed(ResourceKind::SqlInstance, name, None);
        self.with(|c| c.instance_regions.insert(name.to_string(), region.to_string()));
    }

    /// Delete a deployed service behind the pipeline's back.
    pub fn remove_service(&self, name: &str) {
        let prefix = format!("{}:{}@", ResourceKind::RunService, name);
        self.with(|c| {
            c.service_env.remove(name);
            c.resources.retain(|k, _| !k.starts_with(prefix.as_str()));
        });
    }

    pub fn generation(&self, kind: ResourceKind, name: &str, parent: Option<&str>) -> Option<u64> {
        self.with(|c| c.resources.get(&key(kind, name, parent)).copied())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.with(|c| c.calls.clone())
    }

    pub fn clear_calls(&self) {
        self.with(|c| c.calls.clear());
    }

    pub fn creates(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Create(k) => Some(k),
                _ => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(k) => Some(k),
                _ => None,
            })
            .collect()
    }

    pub fn secret_versions(&self, secret: &str) -> Vec<Vec<u8>> {
        self.with(|c| c.secret_versions.get(secret).cloned().unwrap_or_default())
    }

    pub fn last_deployed(&self) -> Option<ServiceSpec> {
        self.with(|c| c.deployed.last().cloned())
    }

    fn record(&self, call: Call) {
        self.with(|c| c.calls.push(call));
    }
}

#[async_trait]
impl ResourceOps for FakeProvider {
    async fn describe(&self, resource: &ResourceDescriptor) -> Result<Description, ProviderError> {
        let k = descriptor_key(resource);
        self.record(Call::Describe(k.clone()));
        self.with(|c| match c.resources.get(&k) {
            Some(generation) => {
                let mut description =
                    serde_json::json!({ "name": resource.name, "generation": generation });
                if resource.kind == ResourceKind::SqlInstance
                    && let Some(region) = c.instance_regions.get(&resource.name)
                {
                    let project = c.project.as_deref().unwrap_or("acme");
                    description["connectionName"] =
                        serde_json::json!(format!("{}:{}:{}", project, region, resource.name));
                }
                Ok(description)
            }
            None => Err(ProviderError::NotFound(resource.to_string())),
        })
    }

    async fn create(&self, spec: &ResourceSpec) -> Result<(), ProviderError> {
        let d = spec.descriptor();
        let k = descriptor_key(&d);
        self.record(Call::Create(k.clone()));
        self.with(|c| {
            if d.kind == ResourceKind::Connector && c.range_in_use {
                return Err(ProviderError::AddressInUse(format!(
                    "{}: the IP range is already in use",
                    d
                )));
            }
            if c.resources.contains_key(&k) {
                return Err(ProviderError::AlreadyExists(d.to_string()));
            }
            match spec {
                ResourceSpec::SqlUser { password, .. } => {
                    c.user_passwords.insert(k.clone(), password.clone());
                }
                ResourceSpec::SqlInstance { name, region, .. } => {
                    c.instance_regions.insert(name.clone(), region.clone());
                }
                _ => {}
            }
            c.next_generation += 1;
            let generation = c.next_generation;
            c.resources.insert(k, generation);
            c.created.push(spec.clone());
            Ok(())
        })
    }

    async fn delete(&self, resource: &ResourceDescriptor) -> Result<(), ProviderError> {
        let k = descriptor_key(resource);
        self.record(Call::Delete(k.clone()));
        self.with(|c| {
            if c.deny_delete {
                return Err(ProviderError::PermissionDenied(resource.to_string()));
            }
            if c.resources.remove(&k).is_none() {
                return Err(ProviderError::NotFound(resource.to_string()));
            }
            if resource.kind == ResourceKind::SqlInstance {
                // Databases and users go with their instance.
                let prefixes = [
                    format!("{}:{}/", ResourceKind::SqlDatabase, resource.name),
                    format!("{}:{}/", ResourceKind::SqlUser, resource.name),
                ];
                c.resources
                    .retain(|key, _| !prefixes.iter().any(|p| key.starts_with(p.as_str())));
            }
            Ok(())
        })
    }
}

#[async_trait]
impl ServiceUsageOps for FakeProvider {
    async fn list_enabled_services(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.with(|c| c.enabled_services.iter().cloned().collect()))
    }

    async fn enable_services(&self, services: &[String]) -> Result<(), ProviderError> {
        self.record(Call::EnableServices(services.to_vec()));
        self.with(|c| c.enabled_services.extend(services.iter().cloned()));
        Ok(())
    }
}

#[async_trait]
impl SecretOps for FakeProvider {
    async fn add_secret_version(
        &self,
        secret: &str,
        value: &[u8],
    ) -> Result<SecretVersion, ProviderError> {
        self.record(Call::AddSecretVersion(secret.to_string()));
        self.with(|c| {
            if !c.resources.contains_key(&key(ResourceKind::Secret, secret, None)) {
                return Err(ProviderError::NotFound(format!("secret {}", secret)));
            }
            let versions = c.secret_versions.entry(secret.to_string()).or_default();
            versions.push(value.to_vec());
            Ok(SecretVersion(versions.len() as u64))
        })
    }
}

#[async_trait]
impl IamOps for FakeProvider {
    async fn grant_role(&self, binding: &RoleBinding) -> Result<(), ProviderError> {
        self.record(Call::GrantRole(binding.role.clone()));
        self.with(|c| c.grants.push(binding.clone()));
        Ok(())
    }
}

#[async_trait]
impl BuildOps for FakeProvider {
    async fn build_and_push(&self, request: &BuildRequest) -> Result<(), ProviderError> {
        self.record(Call::Build(request.target.to_string()));
        Ok(())
    }
}

#[async_trait]
impl RunOps for FakeProvider {
    async fn deploy_service(&self, spec: &ServiceSpec) -> Result<(), ProviderError> {
        self.record(Call::Deploy(spec.name.clone()));
        let service =
            ResourceDescriptor::new(ResourceKind::RunService, &spec.name).with_location(&spec.region);
        self.with(|c| {
            c.next_generation += 1;
            let generation = c.next_generation;
            c.resources.insert(descriptor_key(&service), generation);
            c.service_env.insert(spec.name.clone(), spec.env.clone());
            c.deployed.push(spec.clone());
        });
        Ok(())
    }

    async fn update_service_env(
        &self,
        name: &str,
        _region: &str,
        env: &std::collections::BTreeMap<String, String>,
    ) -> Result<(), ProviderError> {
        self.record(Call::UpdateEnv(name.to_string()));
        self.with(|c| match c.service_env.get_mut(name) {
            Some(current) => {
                current.extend(env.clone());
                Ok(())
            }
            None => Err(ProviderError::NotFound(format!("service {}", name))),
        })
    }

    async fn service_url(&self, name: &str, _region: &str) -> Result<Option<String>, ProviderError> {
        self.record(Call::ServiceUrl(name.to_string()));
        self.with(|c| {
            if !c.service_env.contains_key(name) {
                return Err(ProviderError::NotFound(format!("service {}", name)));
            }
            if c.no_url {
                Ok(None)
            } else {
                Ok(Some(format!("https://{}-abc123-uc.a.run.app", name)))
            }
        })
    }
}

#[async_trait]
impl LogOps for FakeProvider {
    async fn read_logs(
        &self,
        service: &str,
        _region: &str,
        _limit: u32,
    ) -> Result<Vec<LogLine>, ProviderError> {
        self.record(Call::ReadLogs(service.to_string()));
        Ok(Vec::new())
    }
}

#[async_trait]
impl ProjectOps for FakeProvider {
    async fn preflight(&self) -> Result<(), ProviderError> {
        if self.with(|c| c.unsupported) {
            Err(ProviderError::Unsupported("fake provider disabled".to_string()))
        } else {
            Ok(())
        }
    }

    async fn active_project(&self) -> Result<Option<String>, ProviderError> {
        Ok(self.with(|c| c.active_project.clone()))
    }

    fn use_project(&self, project: &str) {
        self.with(|c| c.project = Some(project.to_string()));
    }

    async fn default_service_identity(&self) -> Result<String, ProviderError> {
        Ok("123456789-compute@developer.gserviceaccount.com".to_string())
    }
}
