// ABOUTME: Configuration for the provisioning pipeline.
// ABOUTME: Optional runway.yml defaults, layered variables, and the resolved typed Settings.

mod action_mode;
mod deserialize;
mod env_value;
mod init;
mod vars;

pub use action_mode::{ActionMode, ParseActionModeError};
pub use env_value::{EnvValue, resolve_env_map};
pub use init::init_config;
pub use vars::{Origin, Vars};

use deserialize::{deserialize_cidr, deserialize_image_ref, deserialize_resource_name, deserialize_steps};

use crate::error::{Error, Result};
use crate::types::{ImageRef, Ipv4Cidr, ResourceName};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

pub const CONFIG_FILENAME: &str = "runway.yml";
pub const CONFIG_FILENAME_ALT: &str = "runway.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".runway/config.yml";

pub const DEFAULT_REGION: &str = "us-central1";
pub const DEFAULT_CONNECTOR_RANGE: &str = "10.8.0.0/28";
pub const DEFAULT_UPSTREAM_IMAGE: &str = "docker.io/n8nio/n8n:latest";

/// Names of the variables the pipeline reads.
pub mod var {
    pub const ACTION_MODE: &str = "DB_ACTION";
    pub const STEPS: &str = "STEPS";
    pub const SERVICE_NAME: &str = "SERVICE_NAME";
    pub const UPSTREAM_IMAGE: &str = "UPSTREAM_IMAGE";
    pub const DB_TIER: &str = "DB_TIER";
    pub const DB_VERSION: &str = "DB_VERSION";
    pub const NETWORK: &str = "NETWORK";
    pub const PEERING_RANGE_NAME: &str = "PEERING_RANGE_NAME";
    pub const ARTIFACT_REPO: &str = "ARTIFACT_REPO";
    pub const SERVICE_ACCOUNT: &str = "SERVICE_ACCOUNT";
    pub const SERVICE_PORT: &str = "SERVICE_PORT";
}

/// Default pipeline step order.
pub const DEFAULT_STEPS: [&str; 5] = ["network", "database", "secrets", "image", "service"];

/// Services the provider must have enabled before anything else is created.
pub const REQUIRED_SERVICES: [&str; 8] = [
    "run.googleapis.com",
    "sqladmin.googleapis.com",
    "secretmanager.googleapis.com",
    "artifactregistry.googleapis.com",
    "cloudbuild.googleapis.com",
    "vpcaccess.googleapis.com",
    "servicenetworking.googleapis.com",
    "compute.googleapis.com",
];

/// Contents of `runway.yml`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default, deserialize_with = "deserialize_resource_name")]
    pub service: Option<ResourceName>,

    #[serde(default, deserialize_with = "deserialize_image_ref")]
    pub upstream_image: Option<ImageRef>,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default, deserialize_with = "deserialize_steps")]
    pub steps: Option<NonEmpty<String>>,

    #[serde(default)]
    pub network: NetworkFile,

    #[serde(default)]
    pub database: DatabaseFile,

    #[serde(default)]
    pub registry: RegistryFile,

    #[serde(default)]
    pub run: RunFile,

    #[serde(default)]
    pub env: BTreeMap<String, EnvValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkFile {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_resource_name")]
    pub connector: Option<ResourceName>,
    #[serde(default, deserialize_with = "deserialize_cidr")]
    pub connector_range: Option<Ipv4Cidr>,
    #[serde(default, deserialize_with = "deserialize_resource_name")]
    pub peering_range: Option<ResourceName>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseFile {
    #[serde(default, deserialize_with = "deserialize_resource_name")]
    pub instance: Option<ResourceName>,
    pub name: Option<String>,
    pub user: Option<String>,
    pub tier: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryFile {
    #[serde(default, deserialize_with = "deserialize_resource_name")]
    pub repository: Option<ResourceName>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunFile {
    pub port: Option<u16>,
    pub memory: Option<String>,
    pub cpu: Option<String>,
    pub min_instances: Option<u32>,
    pub max_instances: Option<u32>,
    pub service_account: Option<String>,
    pub allow_unauthenticated: Option<bool>,
    pub admin_user: Option<String>,
}

impl FileConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load the first config file found in `dir`, or defaults if there is none.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!("using config file {}", path.display());
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }
}

/// Fully resolved pipeline inputs.
#[derive(Debug, Clone)]
pub struct Settings {
    pub service: ResourceName,
    pub upstream_image: ImageRef,
    pub default_region: String,
    pub action_mode: ActionMode,
    pub steps: NonEmpty<String>,
    pub network: NetworkSettings,
    pub database: DatabaseSettings,
    pub secrets: SecretNames,
    pub registry: RegistrySettings,
    pub run: RunSettings,
}

#[derive(Debug, Clone)]
pub struct NetworkSettings {
    pub network: String,
    pub connector: ResourceName,
    pub connector_range: Ipv4Cidr,
    pub peering_range: ResourceName,
    pub peering_prefix_len: u8,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub instance: ResourceName,
    pub name: String,
    pub user: String,
    pub tier: String,
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct SecretNames {
    pub db_password: ResourceName,
    pub encryption_key: ResourceName,
    pub admin_password: ResourceName,
}

#[derive(Debug, Clone)]
pub struct RegistrySettings {
    pub repository: ResourceName,
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub port: u16,
    pub memory: String,
    pub cpu: String,
    pub min_instances: u32,
    pub max_instances: u32,
    pub service_account: Option<String>,
    pub allow_unauthenticated: bool,
    pub admin_user: String,
    pub env: BTreeMap<String, String>,
}

impl Settings {
    /// Resolve settings from variables first, then the config file, then built-in defaults.
    pub fn resolve(file: &FileConfig, vars: &Vars) -> Result<Self> {
        use crate::state::StateKey;

        let service = pick_parsed(vars, var::SERVICE_NAME, file.service.clone(), || {
            ResourceName::new("n8n")
        })?;

        let upstream_image = pick_parsed(vars, var::UPSTREAM_IMAGE, file.upstream_image.clone(), || {
            ImageRef::parse(DEFAULT_UPSTREAM_IMAGE)
        })?;

        let action_mode = vars
            .get(var::ACTION_MODE)
            .map(str::parse::<ActionMode>)
            .transpose()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?
            .unwrap_or_default();

        let steps = match vars.get(var::STEPS) {
            Some(list) => {
                let names: Vec<String> = list
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                NonEmpty::from_vec(names)
                    .ok_or_else(|| Error::InvalidConfig(format!("{} lists no steps", var::STEPS)))?
            }
            None => match &file.steps {
                Some(steps) => steps.clone(),
                None => default_steps(),
            },
        };

        let connector_range = pick_parsed(
            vars,
            StateKey::ConnectorRange.as_str(),
            file.network.connector_range,
            || Ipv4Cidr::parse(DEFAULT_CONNECTOR_RANGE),
        )?;
        if connector_range.prefix_len() != 28 {
            return Err(Error::InvalidConfig(format!(
                "{} must be a /28 range, got {}",
                StateKey::ConnectorRange,
                connector_range
            )));
        }

        let network_name = pick(vars, var::NETWORK, file.network.name.clone(), "default");
        let network = NetworkSettings {
            connector: pick_parsed(
                vars,
                StateKey::ConnectorName.as_str(),
                file.network.connector.clone(),
                || service.with_suffix("connector"),
            )?,
            connector_range,
            peering_range: pick_parsed(
                vars,
                var::PEERING_RANGE_NAME,
                file.network.peering_range.clone(),
                || ResourceName::new(&format!("google-managed-services-{}", network_name)),
            )?,
            peering_prefix_len: 16,
            network: network_name,
        };

        let database = DatabaseSettings {
            instance: pick_parsed(
                vars,
                StateKey::DbInstance.as_str(),
                file.database.instance.clone(),
                || service.with_suffix("db"),
            )?,
            name: sql_identifier(
                StateKey::DbName.as_str(),
                pick(vars, StateKey::DbName.as_str(), file.database.name.clone(), "n8n"),
            )?,
            user: sql_identifier(
                StateKey::DbUser.as_str(),
                pick(vars, StateKey::DbUser.as_str(), file.database.user.clone(), "n8n-user"),
            )?,
            tier: pick(vars, var::DB_TIER, file.database.tier.clone(), "db-f1-micro"),
            version: pick(vars, var::DB_VERSION, file.database.version.clone(), "POSTGRES_13"),
        };

        let secrets = SecretNames {
            db_password: service.with_suffix("db-password").map_err(invalid_name)?,
            encryption_key: service.with_suffix("encryption-key").map_err(invalid_name)?,
            admin_password: service.with_suffix("admin-password").map_err(invalid_name)?,
        };

        let registry = RegistrySettings {
            repository: pick_parsed(vars, var::ARTIFACT_REPO, file.registry.repository.clone(), || {
                service.with_suffix("repo")
            })?,
        };

        let port = match vars.get(var::SERVICE_PORT) {
            Some(p) => p.parse().map_err(|_| {
                Error::InvalidConfig(format!("{} must be a port number, got {:?}", var::SERVICE_PORT, p))
            })?,
            None => file.run.port.unwrap_or(5678),
        };

        let run = RunSettings {
            port,
            memory: file.run.memory.clone().unwrap_or_else(|| "2Gi".to_string()),
            cpu: file.run.cpu.clone().unwrap_or_else(|| "1".to_string()),
            min_instances: file.run.min_instances.unwrap_or(0),
            max_instances: file.run.max_instances.unwrap_or(1),
            service_account: vars
                .get(var::SERVICE_ACCOUNT)
                .map(str::to_string)
                .or_else(|| file.run.service_account.clone()),
            allow_unauthenticated: file.run.allow_unauthenticated.unwrap_or(true),
            admin_user: file.run.admin_user.clone().unwrap_or_else(|| "admin".to_string()),
            env: resolve_env_map(&file.env, vars)?,
        };
        if run.min_instances > run.max_instances {
            return Err(Error::InvalidConfig(format!(
                "run.min_instances ({}) exceeds run.max_instances ({})",
                run.min_instances, run.max_instances
            )));
        }

        Ok(Settings {
            service,
            upstream_image,
            default_region: file
                .region
                .clone()
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            action_mode,
            steps,
            network,
            database,
            secrets,
            registry,
            run,
        })
    }
}

fn default_steps() -> NonEmpty<String> {
    NonEmpty {
        head: DEFAULT_STEPS[0].to_string(),
        tail: DEFAULT_STEPS[1..].iter().map(|s| s.to_string()).collect(),
    }
}

fn invalid_name(e: crate::types::ResourceNameError) -> Error {
    Error::InvalidConfig(e.to_string())
}

fn pick(vars: &Vars, key: &str, file: Option<String>, default: &str) -> String {
    vars.get(key)
        .map(str::to_string)
        .or(file)
        .unwrap_or_else(|| default.to_string())
}

fn pick_parsed<T, E, F>(vars: &Vars, key: &str, file: Option<T>, default: F) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    E: Display,
    F: FnOnce() -> std::result::Result<T, E>,
{
    if let Some(raw) = vars.get(key) {
        return raw
            .parse::<T>()
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", key, e)));
    }
    match file {
        Some(value) => Ok(value),
        None => default().map_err(|e| Error::InvalidConfig(format!("{}: {}", key, e))),
    }
}

fn sql_identifier(key: &str, value: String) -> Result<String> {
    let valid = value.starts_with(|c: char| c.is_ascii_alphabetic())
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(value)
    } else {
        Err(Error::InvalidConfig(format!(
            "{} must start with a letter and contain only letters, digits, '_' or '-': {:?}",
            key, value
        )))
    }
}
