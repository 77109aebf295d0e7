// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Writes a commented runway.yml with the built-in defaults.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{ImageRef, ResourceName};

use super::{CONFIG_FILENAME, DEFAULT_CONNECTOR_RANGE, DEFAULT_REGION, DEFAULT_UPSTREAM_IMAGE};

pub fn init_config(
    dir: &Path,
    service: Option<&str>,
    image: Option<&str>,
    force: bool,
) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let service = ResourceName::new(service.unwrap_or("n8n"))
        .map_err(|e| Error::InvalidConfig(e.to_string()))?;
    let image = ImageRef::parse(image.unwrap_or(DEFAULT_UPSTREAM_IMAGE))
        .map_err(|e| Error::InvalidConfig(e.to_string()))?;

    std::fs::write(&config_path, generate_template_yaml(&service, &image))?;
    Ok(())
}

fn generate_template_yaml(service: &ResourceName, image: &ImageRef) -> String {
    format!(
        r#"service: {service}
upstream_image: {image}
region: {DEFAULT_REGION}

# Variables (environment, state file, or KEY=VALUE tokens to `runway up`)
# take precedence over every value below.
network:
  name: default
  connector: {service}-connector
  connector_range: {DEFAULT_CONNECTOR_RANGE}

database:
  instance: {service}-db
  name: n8n
  user: n8n-user
  tier: db-f1-micro
  version: POSTGRES_13

registry:
  repository: {service}-repo

run:
  port: 5678
  memory: 2Gi
  cpu: "1"
  min_instances: 0
  max_instances: 1

# Extra plain environment for the service. Secrets never go here.
env:
  GENERIC_TIMEZONE: UTC
  # TZ: {{ env: TZ, default: UTC }}
"#
    )
}
