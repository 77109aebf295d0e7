// ABOUTME: State transition methods for the two-pass service deployment.
// ABOUTME: Each method consumes self and returns the next state on success.

use std::collections::BTreeMap;

use snafu::ResultExt;

use crate::provider::RunOps;
use crate::steps::error::{ProviderSnafu, StepError};

use super::deployment::ServiceDeployment;
use super::state::{AddressKnown, Configured, Created, Pending};

// =============================================================================
// Pending -> Created
// =============================================================================

impl ServiceDeployment<Pending> {
    /// First pass: deploy with everything except the service's own address.
    #[must_use = "deployment state must be used"]
    pub async fn deploy<R: RunOps + ?Sized>(
        self,
        run: &R,
    ) -> Result<ServiceDeployment<Created>, StepError> {
        run.deploy_service(&self.spec).await.context(ProviderSnafu {
            action: format!("deploy service {}", self.spec.name),
        })?;
        Ok(self.transition(Created))
    }
}

// =============================================================================
// Created -> AddressKnown
// =============================================================================

impl ServiceDeployment<Created> {
    /// Read back the externally visible address. A service without one is fatal.
    #[must_use = "deployment state must be used"]
    pub async fn fetch_address<R: RunOps + ?Sized>(
        self,
        run: &R,
    ) -> Result<ServiceDeployment<AddressKnown>, StepError> {
        let url = run
            .service_url(&self.spec.name, &self.spec.region)
            .await
            .context(ProviderSnafu {
                action: format!("read the address of service {}", self.spec.name),
            })?;

        match url {
            Some(url) if url.starts_with("https://") || url.starts_with("http://") => {
                Ok(self.transition(AddressKnown { url }))
            }
            Some(other) => Err(StepError::PostDeployVerification {
                service: self.spec.name.clone(),
                message: format!("unexpected address {:?}", other),
            }),
            None => Err(StepError::PostDeployVerification {
                service: self.spec.name.clone(),
                message: "the provider reported no address".to_string(),
            }),
        }
    }
}

// =============================================================================
// AddressKnown -> Configured
// =============================================================================

impl ServiceDeployment<AddressKnown> {
    /// Second pass: tell the application its own public address.
    #[must_use = "deployment state must be used"]
    pub async fn configure<R: RunOps + ?Sized>(
        self,
        run: &R,
    ) -> Result<ServiceDeployment<Configured>, StepError> {
        let env = address_env(&self.state.url);
        run.update_service_env(&self.spec.name, &self.spec.region, &env)
            .await
            .context(ProviderSnafu {
                action: format!("configure the address of service {}", self.spec.name),
            })?;

        let url = self.state.url.clone();
        Ok(self.transition(Configured { url }))
    }
}

/// Variables that depend on the service's own address.
pub fn address_env(url: &str) -> BTreeMap<String, String> {
    let base = url.trim_end_matches('/');
    let (protocol, host) = base.split_once("://").unwrap_or(("https", base));

    let mut env = BTreeMap::new();
    env.insert("N8N_HOST".to_string(), host.to_string());
    env.insert("N8N_PROTOCOL".to_string(), protocol.to_string());
    env.insert("WEBHOOK_URL".to_string(), format!("{}/", base));
    env.insert("N8N_EDITOR_BASE_URL".to_string(), format!("{}/", base));
    env
}
