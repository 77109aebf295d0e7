// ABOUTME: Step error types with SNAFU pattern.
// ABOUTME: Fatal step failures carry a remediation or the underlying provider cause.

use snafu::Snafu;

use crate::provider::{ProviderError, ProviderErrorKind};
use crate::reconcile::ReconcileError;
use crate::state::StateError;
use crate::types::Ipv4Cidr;

/// Fatal failure inside a provisioning step.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StepError {
    #[snafu(display("{what} is required: {remedy}"))]
    MissingPrecondition { what: String, remedy: String },

    #[snafu(display(
        "connector range {range} is already in use; choose a free /28 with CONNECTOR_RANGE=..."
    ))]
    ConnectorRangeInUse {
        range: Ipv4Cidr,
        source: ReconcileError,
    },

    #[snafu(display(
        "service {service} was deployed but could not be verified: {message}; it may be only partially configured"
    ))]
    PostDeployVerification { service: String, message: String },

    #[snafu(display("invalid input: {message}"))]
    InvalidInput { message: String },

    #[snafu(display("{source}"))]
    Reconcile { source: ReconcileError },

    #[snafu(display("failed to {action}: {source}"))]
    Provider {
        action: String,
        source: ProviderError,
    },

    #[snafu(display("failed to persist state: {source}"))]
    State { source: StateError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepErrorKind {
    /// A value the step depends on is missing; nothing was mutated.
    MissingPrecondition,
    /// The connector address range overlaps an existing allocation.
    ConnectorRangeInUse,
    /// The service exists but its post-deploy checks failed.
    PostDeployVerification,
    /// A derived value could not be built from the inputs.
    InvalidInput,
    /// A provider call failed.
    Provider,
    /// The state file could not be written.
    State,
}

impl StepError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> StepErrorKind {
        match self {
            StepError::MissingPrecondition { .. } => StepErrorKind::MissingPrecondition,
            StepError::ConnectorRangeInUse { .. } => StepErrorKind::ConnectorRangeInUse,
            StepError::PostDeployVerification { .. } => StepErrorKind::PostDeployVerification,
            StepError::InvalidInput { .. } => StepErrorKind::InvalidInput,
            StepError::Reconcile { .. } | StepError::Provider { .. } => StepErrorKind::Provider,
            StepError::State { .. } => StepErrorKind::State,
        }
    }

    /// Kind of the underlying provider failure, if there is one.
    pub fn provider_kind(&self) -> Option<ProviderErrorKind> {
        match self {
            StepError::ConnectorRangeInUse { source, .. } | StepError::Reconcile { source } => {
                Some(source.kind())
            }
            StepError::Provider { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

impl From<ReconcileError> for StepError {
    fn from(source: ReconcileError) -> Self {
        StepError::Reconcile { source }
    }
}

impl From<StateError> for StepError {
    fn from(source: StateError) -> Self {
        StepError::State { source }
    }
}
