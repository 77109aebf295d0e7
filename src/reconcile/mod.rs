// ABOUTME: Ensure-present / ensure-absent-then-present reconciliation over ResourceOps.
// ABOUTME: Existence comes from the provider; destructive deletes only ever warn.

mod error;

pub use error::ReconcileError;

use crate::config::ActionMode;
use crate::diagnostics::{Diagnostics, Warning};
use crate::provider::{Description, ProviderError, ResourceDescriptor, ResourceOps, ResourceSpec};

/// Result of [`Reconciler::ensure_present`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The resource was already there; nothing was created.
    Existed,
    /// The resource was created by this call.
    Created,
}

/// Result of [`Reconciler::destroy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Deleted,
    AlreadyAbsent,
    /// Delete failed; a warning was recorded.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    Absent,
}

/// Converges individual resources toward existence.
///
/// Never retries. A describe that fails with anything other than not-found
/// aborts the caller.
pub struct Reconciler<'a, R: ResourceOps + ?Sized> {
    ops: &'a R,
    diag: &'a mut Diagnostics,
}

impl<'a, R: ResourceOps + ?Sized> Reconciler<'a, R> {
    pub fn new(ops: &'a R, diag: &'a mut Diagnostics) -> Self {
        Self { ops, diag }
    }

    pub async fn observe(&self, resource: &ResourceDescriptor) -> Result<Presence, ReconcileError> {
        Ok(match self.lookup(resource).await? {
            Some(_) => Presence::Present,
            None => Presence::Absent,
        })
    }

    /// The provider's description of `resource`, or `None` when it does not exist.
    pub async fn lookup(
        &self,
        resource: &ResourceDescriptor,
    ) -> Result<Option<Description>, ReconcileError> {
        match self.ops.describe(resource).await {
            Ok(description) => Ok(Some(description)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(source) => Err(ReconcileError::Describe {
                resource: resource.clone(),
                source,
            }),
        }
    }

    /// Create `spec` unless it exists. `Destroy` first removes the destroy target.
    pub async fn ensure_present(
        &mut self,
        spec: &ResourceSpec,
        mode: ActionMode,
    ) -> Result<Outcome, ReconcileError> {
        let resource = spec.descriptor();

        if mode == ActionMode::Destroy {
            self.destroy(&resource.destroy_target()).await;
        }

        if self.observe(&resource).await? == Presence::Present {
            tracing::info!("{} already exists, skipping", resource);
            return Ok(Outcome::Existed);
        }

        match self.ops.create(spec).await {
            Ok(()) => {
                tracing::info!("created {}", resource);
                Ok(Outcome::Created)
            }
            Err(ProviderError::AlreadyExists(_)) => {
                tracing::info!("{} appeared concurrently, treating as existing", resource);
                Ok(Outcome::Existed)
            }
            Err(source) => Err(ReconcileError::Create { resource, source }),
        }
    }

    /// `Drop` deletes the resource itself before ensuring it; other modes act like
    /// [`ensure_present`](Self::ensure_present) with `Ignore`.
    pub async fn ensure_absent_then_present(
        &mut self,
        spec: &ResourceSpec,
        mode: ActionMode,
    ) -> Result<Outcome, ReconcileError> {
        if mode == ActionMode::Drop {
            self.destroy(&spec.descriptor()).await;
        }
        self.ensure_present(spec, ActionMode::Ignore).await
    }

    /// Best-effort delete. Not-found is silent; other failures become warnings.
    pub async fn destroy(&mut self, resource: &ResourceDescriptor) -> Removal {
        match self.ops.delete(resource).await {
            Ok(()) => {
                tracing::info!("deleted {}", resource);
                Removal::Deleted
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!("{} already absent", resource);
                Removal::AlreadyAbsent
            }
            Err(e) => {
                self.diag.warn(Warning::destructive_delete(format!(
                    "could not delete {}: {}",
                    resource, e
                )));
                Removal::Failed
            }
        }
    }
}
