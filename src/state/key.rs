// ABOUTME: Well-known keys written to the state file by provisioning steps.
// ABOUTME: Keeps key spelling in one place and flags secret-bearing keys.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    ProjectId,
    Region,
    ConnectorName,
    ConnectorRange,
    DbInstance,
    DbName,
    DbUser,
    DbPassword,
    DbConnectionName,
    ImageUrl,
    ServiceUrl,
    DeployStage,
}

impl StateKey {
    pub const ALL: [StateKey; 12] = [
        StateKey::ProjectId,
        StateKey::Region,
        StateKey::ConnectorName,
        StateKey::ConnectorRange,
        StateKey::DbInstance,
        StateKey::DbName,
        StateKey::DbUser,
        StateKey::DbPassword,
        StateKey::DbConnectionName,
        StateKey::ImageUrl,
        StateKey::ServiceUrl,
        StateKey::DeployStage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateKey::ProjectId => "PROJECT_ID",
            StateKey::Region => "REGION",
            StateKey::ConnectorName => "CONNECTOR_NAME",
            StateKey::ConnectorRange => "CONNECTOR_RANGE",
            StateKey::DbInstance => "DB_INSTANCE",
            StateKey::DbName => "DB_NAME",
            StateKey::DbUser => "DB_USER",
            StateKey::DbPassword => "DB_PASSWORD",
            StateKey::DbConnectionName => "DB_CONNECTION_NAME",
            StateKey::ImageUrl => "IMAGE_URL",
            StateKey::ServiceUrl => "SERVICE_URL",
            StateKey::DeployStage => "DEPLOY_STAGE",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// Whether the value is credential material that must not be echoed.
    pub fn is_secret(&self) -> bool {
        matches!(self, StateKey::DbPassword)
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
