// ABOUTME: Provider API surface consumed by the provisioning steps.
// ABOUTME: Capability traits, resource descriptors, and the gcloud CLI adapter.

mod error;
pub mod gcloud;
mod resource;
mod shared_types;
mod traits;

pub use error::{ProviderError, ProviderErrorKind};
pub use gcloud::GcloudProvider;
pub use resource::{ResourceDescriptor, ResourceKind, ResourceSpec};
pub use shared_types::{
    BindingScope, BuildRequest, Description, LogLine, RoleBinding, SecretRef, SecretVersion,
    ServiceSpec,
};
pub use traits::{
    BuildOps, IamOps, LogOps, ProjectOps, Provider, ResourceOps, RunOps, SecretOps,
    ServiceUsageOps,
};
