// ABOUTME: Explicit context threaded through every provisioning step.
// ABOUTME: Reads see all variable layers; writes persist to state before becoming visible.

use crate::config::{Settings, Vars};
use crate::diagnostics::Diagnostics;
use crate::output::Output;
use crate::provider::Provider;
use crate::reconcile::Reconciler;
use crate::state::{StateKey, StateRecord, StateStore};

use super::error::StepError;

/// Everything a step may read or change.
pub struct StepContext<'a> {
    pub settings: &'a Settings,
    pub vars: &'a mut Vars,
    pub store: &'a mut StateStore,
    pub provider: &'a dyn Provider,
    pub output: &'a Output,
    pub diag: &'a mut Diagnostics,
}

impl<'a> StepContext<'a> {
    /// Current value of a state key from any layer.
    pub fn get(&self, key: StateKey) -> Option<&str> {
        self.vars.get(key.as_str())
    }

    /// Like [`get`](Self::get), failing with a remediation hint when unset.
    pub fn require(&self, key: StateKey, remedy: &str) -> Result<String, StepError> {
        self.get(key)
            .map(str::to_string)
            .ok_or_else(|| StepError::MissingPrecondition {
                what: key.to_string(),
                remedy: remedy.to_string(),
            })
    }

    /// Persist `value` under `key` and make it visible to later reads.
    pub fn save(&mut self, key: StateKey, value: &str) -> Result<(), StepError> {
        self.store.put(key.as_str(), value)?;
        self.vars.set(key.as_str(), value);
        tracing::debug!("saved {}", key);
        Ok(())
    }

    /// Typed view over the current values.
    pub fn record(&self) -> Result<StateRecord, StepError> {
        Ok(StateRecord::from_lookup(|k| {
            self.vars.get(k).map(str::to_string)
        })?)
    }

    pub fn project(&self) -> Result<String, StepError> {
        self.require(
            StateKey::ProjectId,
            "run the network step first or pass PROJECT_ID=...",
        )
    }

    /// Region from the variables, else the configured default.
    pub fn region(&self) -> String {
        self.get(StateKey::Region)
            .map(str::to_string)
            .unwrap_or_else(|| self.settings.default_region.clone())
    }

    pub fn reconciler(&mut self) -> Reconciler<'_, dyn Provider + 'a> {
        Reconciler::new(self.provider, self.diag)
    }
}
