// ABOUTME: Descriptors and creation requests for provider-side resources.
// ABOUTME: Existence is always checked against the provider, never inferred locally.

use std::fmt;

use crate::types::Ipv4Cidr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Network,
    AddressReservation,
    Peering,
    Connector,
    SqlInstance,
    SqlDatabase,
    SqlUser,
    Secret,
    ArtifactRepo,
    Image,
    RunService,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Network => "network",
            ResourceKind::AddressReservation => "address-reservation",
            ResourceKind::Peering => "peering",
            ResourceKind::Connector => "connector",
            ResourceKind::SqlInstance => "sql-instance",
            ResourceKind::SqlDatabase => "sql-database",
            ResourceKind::SqlUser => "sql-user",
            ResourceKind::Secret => "secret",
            ResourceKind::ArtifactRepo => "artifact-repo",
            ResourceKind::Image => "image",
            ResourceKind::RunService => "run-service",
        }
    }

    /// Kind of the resource that contains this one, if any.
    pub fn parent_kind(&self) -> Option<ResourceKind> {
        match self {
            ResourceKind::SqlDatabase | ResourceKind::SqlUser => Some(ResourceKind::SqlInstance),
            ResourceKind::Peering => Some(ResourceKind::Network),
            ResourceKind::Image => Some(ResourceKind::ArtifactRepo),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a provider-side resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    pub name: String,
    /// Name of the containing resource (instance for databases and users).
    pub parent: Option<String>,
    /// Region or location scope, for regional resources.
    pub location: Option<String>,
}

impl ResourceDescriptor {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            parent: None,
            location: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Descriptor of the containing resource, when both its kind and name are known.
    pub fn parent_descriptor(&self) -> Option<ResourceDescriptor> {
        let kind = self.kind.parent_kind()?;
        let name = self.parent.clone()?;
        Some(ResourceDescriptor {
            kind,
            name,
            parent: None,
            location: self.location.clone(),
        })
    }

    /// What `destroy` mode deletes: the parent when there is one, else the resource itself.
    pub fn destroy_target(&self) -> ResourceDescriptor {
        self.parent_descriptor().unwrap_or_else(|| self.clone())
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)?;
        if let Some(parent) = &self.parent {
            write!(f, " in {}", parent)?;
        }
        if let Some(location) = &self.location {
            write!(f, " ({})", location)?;
        }
        Ok(())
    }
}

/// A request to create one resource, with its creation parameters.
#[derive(Clone, PartialEq, Eq)]
pub enum ResourceSpec {
    Network {
        name: String,
    },
    AddressReservation {
        name: String,
        network: String,
        prefix_len: u8,
    },
    Peering {
        network: String,
        range: String,
    },
    Connector {
        name: String,
        region: String,
        network: String,
        range: Ipv4Cidr,
    },
    SqlInstance {
        name: String,
        region: String,
        tier: String,
        version: String,
        network: String,
    },
    SqlDatabase {
        name: String,
        instance: String,
    },
    SqlUser {
        name: String,
        instance: String,
        password: String,
    },
    Secret {
        name: String,
    },
    ArtifactRepo {
        name: String,
        region: String,
    },
}

/// Peerings are named after the producer service they connect to.
pub const PEERING_SERVICE: &str = "servicenetworking.googleapis.com";

impl ResourceSpec {
    pub fn descriptor(&self) -> ResourceDescriptor {
        use ResourceKind as K;
        match self {
            ResourceSpec::Network { name } => ResourceDescriptor::new(K::Network, name),
            ResourceSpec::AddressReservation { name, .. } => {
                ResourceDescriptor::new(K::AddressReservation, name)
            }
            ResourceSpec::Peering { network, .. } => {
                ResourceDescriptor::new(K::Peering, PEERING_SERVICE).with_parent(network)
            }
            ResourceSpec::Connector { name, region, .. } => {
                ResourceDescriptor::new(K::Connector, name).with_location(region)
            }
            ResourceSpec::SqlInstance { name, .. } => ResourceDescriptor::new(K::SqlInstance, name),
            ResourceSpec::SqlDatabase { name, instance } => {
                ResourceDescriptor::new(K::SqlDatabase, name).with_parent(instance)
            }
            ResourceSpec::SqlUser { name, instance, .. } => {
                ResourceDescriptor::new(K::SqlUser, name).with_parent(instance)
            }
            ResourceSpec::Secret { name } => ResourceDescriptor::new(K::Secret, name),
            ResourceSpec::ArtifactRepo { name, region } => {
                ResourceDescriptor::new(K::ArtifactRepo, name).with_location(region)
            }
        }
    }
}

impl fmt::Debug for ResourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Keep the password out of logs.
            ResourceSpec::SqlUser { name, instance, .. } => f
                .debug_struct("SqlUser")
                .field("name", name)
                .field("instance", instance)
                .field("password", &"***")
                .finish(),
            other => write!(f, "{}", other.descriptor()),
        }
    }
}
