// ABOUTME: Provisioning steps and the registry that maps step names to them.
// ABOUTME: Each step converges one group of resources and records what later steps need.

mod context;
mod credentials;
mod database;
mod error;
mod image;
mod network;
mod secrets;
pub mod service;

pub use context::StepContext;
pub use credentials::{generate_encryption_key, generate_password};
pub use database::DatabaseStep;
pub use error::{StepError, StepErrorKind};
pub use image::ImageStep;
pub use network::NetworkStep;
pub use secrets::SecretsStep;
pub use service::ServiceStep;

use async_trait::async_trait;

/// One named unit of the pipeline.
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError>;
}

/// Look up a step by the name used in the step list.
pub fn by_name(name: &str) -> Option<Box<dyn Step>> {
    let step: Box<dyn Step> = match name {
        "network" => Box::new(NetworkStep),
        "database" => Box::new(DatabaseStep),
        "secrets" => Box::new(SecretsStep),
        "image" => Box::new(ImageStep),
        "service" => Box::new(ServiceStep),
        _ => return None,
    };
    Some(step)
}
