// ABOUTME: Shared types used across provider trait definitions.
// ABOUTME: ServiceSpec, BuildRequest, RoleBinding, SecretVersion, LogLine.

use crate::types::ImageRef;
use std::collections::BTreeMap;
use std::fmt;

/// Raw provider description of an existing resource.
pub type Description = serde_json::Value;

/// Version number assigned to a newly added secret value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SecretVersion(pub u64);

impl fmt::Display for SecretVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a secret version, resolved by the platform at service start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRef {
    pub secret: String,
    pub version: String,
}

impl SecretRef {
    pub fn latest(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            version: "latest".to_string(),
        }
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.secret, self.version)
    }
}

/// Where an IAM role is granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingScope {
    Project(String),
    Secret(String),
}

/// Grant of `role` to `member` on `scope`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleBinding {
    pub scope: BindingScope,
    /// Member in provider syntax, e.g. `serviceAccount:123-compute@...`.
    pub member: String,
    pub role: String,
}

/// Remote build that republishes an upstream image into the project's registry.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub region: String,
    pub source: ImageRef,
    pub target: ImageRef,
}

/// Configuration for deploying a stateless service.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    /// Service name.
    pub name: String,
    /// Region to deploy in.
    pub region: String,
    /// Image to run.
    pub image: ImageRef,
    /// Container port the service listens on.
    pub port: u16,
    /// Connector used to reach private-network resources.
    pub connector: Option<String>,
    /// Database instance connection name to attach.
    pub sql_instance: Option<String>,
    /// Plain environment variables. Never carries secret values.
    pub env: BTreeMap<String, String>,
    /// Environment variables resolved from secrets at startup.
    pub secrets: BTreeMap<String, SecretRef>,
    /// Memory limit, e.g. `2Gi`.
    pub memory: String,
    /// CPU limit, e.g. `1`.
    pub cpu: String,
    pub min_instances: u32,
    pub max_instances: u32,
    /// Runtime identity; provider default when unset.
    pub service_account: Option<String>,
    /// Whether unauthenticated requests reach the service.
    pub allow_unauthenticated: bool,
}

/// A single log entry from the deployed service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub timestamp: Option<String>,
    pub severity: Option<String>,
    pub message: String,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ts) = &self.timestamp {
            write!(f, "{} ", ts)?;
        }
        if let Some(sev) = &self.severity {
            write!(f, "[{}] ", sev)?;
        }
        write!(f, "{}", self.message)
    }
}
