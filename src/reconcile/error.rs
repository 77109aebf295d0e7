// ABOUTME: Error types for resource reconciliation.
// ABOUTME: Wraps the provider failure together with the resource it concerns.

use crate::provider::{ProviderError, ProviderErrorKind, ResourceDescriptor};

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("failed to look up {resource}: {source}")]
    Describe {
        resource: ResourceDescriptor,
        #[source]
        source: ProviderError,
    },

    #[error("failed to create {resource}: {source}")]
    Create {
        resource: ResourceDescriptor,
        #[source]
        source: ProviderError,
    },
}

impl ReconcileError {
    pub fn resource(&self) -> &ResourceDescriptor {
        match self {
            ReconcileError::Describe { resource, .. } | ReconcileError::Create { resource, .. } => {
                resource
            }
        }
    }

    pub fn provider_error(&self) -> &ProviderError {
        match self {
            ReconcileError::Describe { source, .. } | ReconcileError::Create { source, .. } => {
                source
            }
        }
    }

    pub fn kind(&self) -> ProviderErrorKind {
        self.provider_error().kind()
    }
}
