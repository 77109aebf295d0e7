// ABOUTME: Service deployment parameterized by state marker.
// ABOUTME: Resumes from the persisted stage so an interrupted deploy continues where it stopped.

use crate::provider::ServiceSpec;
use crate::state::DeployStage;

use super::state::{AddressKnown, Configured, Created, Pending};

/// A service deployment in progress, parameterized by its current state.
#[derive(Debug)]
pub struct ServiceDeployment<S> {
    pub(crate) spec: ServiceSpec,
    pub(crate) state: S,
}

impl ServiceDeployment<Pending> {
    pub fn new(spec: ServiceSpec) -> Self {
        ServiceDeployment {
            spec,
            state: Pending,
        }
    }
}

impl<S> ServiceDeployment<S> {
    pub fn spec(&self) -> &ServiceSpec {
        &self.spec
    }

    pub(crate) fn transition<T>(self, state: T) -> ServiceDeployment<T> {
        ServiceDeployment {
            spec: self.spec,
            state,
        }
    }
}

impl ServiceDeployment<AddressKnown> {
    pub fn url(&self) -> &str {
        &self.state.url
    }
}

impl ServiceDeployment<Configured> {
    pub fn url(&self) -> &str {
        &self.state.url
    }
}

/// Where a deployment picks up, given what the state file recorded.
#[derive(Debug)]
pub enum Resumed {
    Pending(ServiceDeployment<Pending>),
    Created(ServiceDeployment<Created>),
    AddressKnown(ServiceDeployment<AddressKnown>),
}

impl Resumed {
    /// Whether any recorded progress is being picked up.
    pub fn is_resuming(&self) -> bool {
        !matches!(self, Resumed::Pending(_))
    }

    /// Discard recorded progress and start from a fresh deploy.
    pub fn restart(self) -> ServiceDeployment<Pending> {
        match self {
            Resumed::Pending(pending) => pending,
            Resumed::Created(created) => created.transition(Pending),
            Resumed::AddressKnown(known) => known.transition(Pending),
        }
    }
}

/// Rebuild the deployment from a persisted stage.
///
/// A finished deployment starts over. A recorded address without a URL falls
/// back to fetching it again.
pub fn resume(spec: ServiceSpec, stage: Option<DeployStage>, url: Option<String>) -> Resumed {
    let pending = ServiceDeployment::new(spec);
    match (stage, url) {
        (Some(DeployStage::AddressKnown), Some(url)) => {
            Resumed::AddressKnown(pending.transition(AddressKnown { url }))
        }
        (Some(DeployStage::AddressKnown), None) | (Some(DeployStage::Created), _) => {
            Resumed::Created(pending.transition(Created))
        }
        (Some(DeployStage::Configured), _) | (None, _) => Resumed::Pending(pending),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageRef;
    use std::collections::BTreeMap;

    fn spec() -> ServiceSpec {
        ServiceSpec {
            name: "n8n".to_string(),
            region: "us-central1".to_string(),
            image: ImageRef::parse("us-central1-docker.pkg.dev/acme/n8n-repo/n8n:latest").unwrap(),
            port: 5678,
            connector: None,
            sql_instance: None,
            env: BTreeMap::new(),
            secrets: BTreeMap::new(),
            memory: "2Gi".to_string(),
            cpu: "1".to_string(),
            min_instances: 0,
            max_instances: 1,
            service_account: None,
            allow_unauthenticated: true,
        }
    }

    #[test]
    fn stages_map_to_resume_points() {
        let url = Some("https://n8n.a.run.app".to_string());
        assert!(matches!(resume(spec(), None, None), Resumed::Pending(_)));
        assert!(matches!(
            resume(spec(), Some(DeployStage::Created), None),
            Resumed::Created(_)
        ));
        assert!(matches!(
            resume(spec(), Some(DeployStage::AddressKnown), url.clone()),
            Resumed::AddressKnown(_)
        ));
        assert!(matches!(
            resume(spec(), Some(DeployStage::AddressKnown), None),
            Resumed::Created(_)
        ));
        assert!(matches!(
            resume(spec(), Some(DeployStage::Configured), url),
            Resumed::Pending(_)
        ));
    }

    #[test]
    fn restart_keeps_the_spec() {
        let resumed = resume(spec(), Some(DeployStage::Created), None);
        assert!(resumed.is_resuming());

        let pending = resumed.restart();
        assert_eq!(pending.spec().name, "n8n");
    }
}
