// ABOUTME: Remote build configuration that republishes an upstream image.
// ABOUTME: Serialized to a temporary YAML file passed to `builds submit`.

use serde::Serialize;
use std::io::Write;

use crate::provider::{BuildRequest, ProviderError};

const DOCKER_BUILDER: &str = "gcr.io/cloud-builders/docker";

#[derive(Debug, Serialize)]
struct BuildConfig {
    steps: Vec<BuildStep>,
    images: Vec<String>,
}

#[derive(Debug, Serialize)]
struct BuildStep {
    name: String,
    args: Vec<String>,
}

impl BuildConfig {
    fn republish(request: &BuildRequest) -> Self {
        let source = request.source.to_string();
        let target = request.target.to_string();
        let docker = |args: &[&str]| BuildStep {
            name: DOCKER_BUILDER.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        };
        Self {
            steps: vec![
                docker(&["pull", source.as_str()]),
                docker(&["tag", source.as_str(), target.as_str()]),
                docker(&["push", target.as_str()]),
            ],
            images: vec![target.clone()],
        }
    }
}

pub fn render(request: &BuildRequest) -> Result<String, ProviderError> {
    serde_yaml::to_string(&BuildConfig::republish(request))
        .map_err(|e| ProviderError::Other(format!("failed to render build config: {}", e)))
}

/// Write the build config to a temporary file that lives as long as the handle.
pub fn write_config(request: &BuildRequest) -> Result<tempfile::NamedTempFile, ProviderError> {
    let yaml = render(request)?;
    let io_err = |e: std::io::Error| {
        ProviderError::Other(format!("failed to write build config: {}", e))
    };

    let mut file = tempfile::Builder::new()
        .prefix("runway-build-")
        .suffix(".yaml")
        .tempfile()
        .map_err(io_err)?;
    file.write_all(yaml.as_bytes()).map_err(io_err)?;
    file.flush().map_err(io_err)?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageRef;

    #[test]
    fn config_pulls_tags_and_pushes() {
        let request = BuildRequest {
            region: "us-central1".to_string(),
            source: ImageRef::parse("docker.io/n8nio/n8n:latest").unwrap(),
            target: ImageRef::parse("us-central1-docker.pkg.dev/acme/n8n/n8n:latest").unwrap(),
        };
        let yaml = render(&request).unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

        let steps = parsed["steps"].as_sequence().unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0]["args"][0].as_str(), Some("pull"));
        assert_eq!(steps[1]["args"][2].as_str(), Some("us-central1-docker.pkg.dev/acme/n8n/n8n:latest"));
        assert_eq!(
            parsed["images"][0].as_str(),
            Some("us-central1-docker.pkg.dev/acme/n8n/n8n:latest")
        );
    }

    #[test]
    fn config_file_contains_rendered_yaml() {
        let request = BuildRequest {
            region: "us-central1".to_string(),
            source: ImageRef::parse("docker.io/n8nio/n8n:1.0").unwrap(),
            target: ImageRef::parse("us-central1-docker.pkg.dev/acme/n8n/n8n:1.0").unwrap(),
        };
        let file = write_config(&request).unwrap();
        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.contains("docker.io/n8nio/n8n:1.0"));
    }
}
