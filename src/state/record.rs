// ABOUTME: Typed view over the values steps persist for each other.
// ABOUTME: Validates known keys so a bad state file fails before any provider call.

use std::fmt;
use std::str::FromStr;

use super::error::StateError;
use super::key::StateKey;
use crate::types::ImageRef;

/// Progress of the two-pass service deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStage {
    /// Service deployed, externally visible address not yet recorded.
    Created,
    /// Address recorded, environment not yet patched with it.
    AddressKnown,
    /// Service patched with its own address.
    Configured,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown deploy stage: {0:?}")]
pub struct ParseDeployStageError(String);

impl DeployStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStage::Created => "created",
            DeployStage::AddressKnown => "address-known",
            DeployStage::Configured => "configured",
        }
    }
}

impl FromStr for DeployStage {
    type Err = ParseDeployStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(DeployStage::Created),
            "address-known" => Ok(DeployStage::AddressKnown),
            "configured" => Ok(DeployStage::Configured),
            other => Err(ParseDeployStageError(other.to_string())),
        }
    }
}

impl fmt::Display for DeployStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived values persisted between steps, parsed and validated.
#[derive(Clone, Default)]
pub struct StateRecord {
    pub project_id: Option<String>,
    pub region: Option<String>,
    pub db_password: Option<String>,
    pub db_connection_name: Option<String>,
    pub image_url: Option<ImageRef>,
    pub service_url: Option<String>,
    pub deploy_stage: Option<DeployStage>,
}

impl StateRecord {
    /// Build the record from a variable lookup (overrides, state, environment).
    ///
    /// Empty values are treated as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: StateKey| lookup(key.as_str()).filter(|v| !v.trim().is_empty());

        let image_url = get(StateKey::ImageUrl)
            .map(|v| ImageRef::parse(&v).map_err(|e| invalid(StateKey::ImageUrl, e)))
            .transpose()?;

        let service_url = get(StateKey::ServiceUrl)
            .map(|v| {
                if v.starts_with("https://") || v.starts_with("http://") {
                    Ok(v)
                } else {
                    Err(invalid(StateKey::ServiceUrl, "expected an http(s) URL"))
                }
            })
            .transpose()?;

        let deploy_stage = get(StateKey::DeployStage)
            .map(|v| v.parse::<DeployStage>().map_err(|e| invalid(StateKey::DeployStage, e)))
            .transpose()?;

        let region = get(StateKey::Region)
            .map(|v| {
                if v.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
                    Ok(v)
                } else {
                    Err(invalid(StateKey::Region, "expected a region like us-central1"))
                }
            })
            .transpose()?;

        Ok(Self {
            project_id: get(StateKey::ProjectId),
            region,
            db_password: get(StateKey::DbPassword),
            db_connection_name: get(StateKey::DbConnectionName),
            image_url,
            service_url,
            deploy_stage,
        })
    }
}

fn invalid(key: StateKey, message: impl fmt::Display) -> StateError {
    StateError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

impl fmt::Debug for StateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateRecord")
            .field("project_id", &self.project_id)
            .field("region", &self.region)
            .field("db_password", &self.db_password.as_ref().map(|_| "***"))
            .field("db_connection_name", &self.db_connection_name)
            .field("image_url", &self.image_url)
            .field("service_url", &self.service_url)
            .field("deploy_stage", &self.deploy_stage)
            .finish()
    }
}
