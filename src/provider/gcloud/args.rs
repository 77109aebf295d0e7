// ABOUTME: Argument builders for each gcloud invocation the adapter makes.
// ABOUTME: Pure functions so command shapes are testable without the CLI installed.

use std::collections::BTreeMap;
use std::path::Path;

use crate::provider::resource::PEERING_SERVICE;
use crate::provider::{
    BindingScope, ProviderError, ResourceDescriptor, ResourceKind, ResourceSpec, RoleBinding,
    ServiceSpec,
};

fn strings(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn required<'a>(
    resource: &'a ResourceDescriptor,
    value: &'a Option<String>,
    what: &str,
) -> Result<&'a str, ProviderError> {
    value
        .as_deref()
        .ok_or_else(|| ProviderError::Other(format!("{} requires a {}", resource, what)))
}

/// Arguments that look a resource up as JSON.
///
/// Peerings and users have no describe command; their lookups are list calls
/// whose empty result means the resource is absent.
pub fn describe(resource: &ResourceDescriptor) -> Result<Vec<String>, ProviderError> {
    let name = resource.name.as_str();
    let mut args = match resource.kind {
        ResourceKind::Network => strings(&["compute", "networks", "describe", name]),
        ResourceKind::AddressReservation => {
            strings(&["compute", "addresses", "describe", name, "--global"])
        }
        ResourceKind::Peering => {
            let network = required(resource, &resource.parent, "network")?;
            vec![
                "services".to_string(),
                "vpc-peerings".to_string(),
                "list".to_string(),
                format!("--network={}", network),
                format!("--service={}", name),
            ]
        }
        ResourceKind::Connector => {
            let region = required(resource, &resource.location, "region")?;
            let mut args = strings(&[
                "compute",
                "networks",
                "vpc-access",
                "connectors",
                "describe",
                name,
            ]);
            args.push(format!("--region={}", region));
            args
        }
        ResourceKind::SqlInstance => strings(&["sql", "instances", "describe", name]),
        ResourceKind::SqlDatabase => {
            let instance = required(resource, &resource.parent, "instance")?;
            let mut args = strings(&["sql", "databases", "describe", name]);
            args.push(format!("--instance={}", instance));
            args
        }
        ResourceKind::SqlUser => {
            let instance = required(resource, &resource.parent, "instance")?;
            vec![
                "sql".to_string(),
                "users".to_string(),
                "list".to_string(),
                format!("--instance={}", instance),
                format!("--filter=name={}", name),
            ]
        }
        ResourceKind::Secret => strings(&["secrets", "describe", name]),
        ResourceKind::ArtifactRepo => {
            let region = required(resource, &resource.location, "location")?;
            let mut args = strings(&["artifacts", "repositories", "describe", name]);
            args.push(format!("--location={}", region));
            args
        }
        ResourceKind::Image => strings(&["artifacts", "docker", "images", "describe", name]),
        ResourceKind::RunService => {
            let region = required(resource, &resource.location, "region")?;
            let mut args = strings(&["run", "services", "describe", name]);
            args.push(format!("--region={}", region));
            args
        }
    };
    args.push("--format=json".to_string());
    Ok(args)
}

/// Whether [`describe`] returns a list rather than a single object.
pub fn describe_is_list(kind: ResourceKind) -> bool {
    matches!(kind, ResourceKind::Peering | ResourceKind::SqlUser)
}

/// Arguments that create a resource and wait for completion.
pub fn create(spec: &ResourceSpec) -> Vec<String> {
    match spec {
        ResourceSpec::Network { name } => {
            strings(&["compute", "networks", "create", name.as_str(), "--subnet-mode=auto"])
        }
        ResourceSpec::AddressReservation {
            name,
            network,
            prefix_len,
        } => {
            let mut args = strings(&[
                "compute",
                "addresses",
                "create",
                name.as_str(),
                "--global",
                "--purpose=VPC_PEERING",
            ]);
            args.push(format!("--prefix-length={}", prefix_len));
            args.push(format!("--network={}", network));
            args
        }
        ResourceSpec::Peering { network, range } => vec![
            "services".to_string(),
            "vpc-peerings".to_string(),
            "connect".to_string(),
            format!("--service={}", PEERING_SERVICE),
            format!("--ranges={}", range),
            format!("--network={}", network),
        ],
        ResourceSpec::Connector {
            name,
            region,
            network,
            range,
        } => {
            let mut args = strings(&[
                "compute",
                "networks",
                "vpc-access",
                "connectors",
                "create",
                name.as_str(),
            ]);
            args.push(format!("--region={}", region));
            args.push(format!("--network={}", network));
            args.push(format!("--range={}", range));
            args
        }
        ResourceSpec::SqlInstance {
            name,
            region,
            tier,
            version,
            network,
        } => {
            let mut args = strings(&["sql", "instances", "create", name.as_str()]);
            args.push(format!("--database-version={}", version));
            args.push(format!("--tier={}", tier));
            args.push(format!("--region={}", region));
            args.push(format!("--network={}", network));
            args.push("--no-assign-ip".to_string());
            args
        }
        ResourceSpec::SqlDatabase { name, instance } => {
            let mut args = strings(&["sql", "databases", "create", name.as_str()]);
            args.push(format!("--instance={}", instance));
            args
        }
        ResourceSpec::SqlUser {
            name,
            instance,
            password,
        } => {
            let mut args = strings(&["sql", "users", "create", name.as_str()]);
            args.push(format!("--instance={}", instance));
            args.push(format!("--password={}", password));
            args
        }
        ResourceSpec::Secret { name } => strings(&[
            "secrets",
            "create",
            name.as_str(),
            "--replication-policy=automatic",
        ]),
        ResourceSpec::ArtifactRepo { name, region } => {
            let mut args = strings(&[
                "artifacts",
                "repositories",
                "create",
                name.as_str(),
                "--repository-format=docker",
            ]);
            args.push(format!("--location={}", region));
            args
        }
    }
}

/// Arguments that delete a resource without prompting.
pub fn delete(resource: &ResourceDescriptor) -> Result<Vec<String>, ProviderError> {
    let name = resource.name.as_str();
    let mut args = match resource.kind {
        ResourceKind::Network => strings(&["compute", "networks", "delete", name]),
        ResourceKind::AddressReservation => {
            strings(&["compute", "addresses", "delete", name, "--global"])
        }
        ResourceKind::Peering => {
            let network = required(resource, &resource.parent, "network")?;
            vec![
                "services".to_string(),
                "vpc-peerings".to_string(),
                "delete".to_string(),
                format!("--service={}", name),
                format!("--network={}", network),
            ]
        }
        ResourceKind::Connector => {
            let region = required(resource, &resource.location, "region")?;
            let mut args = strings(&[
                "compute",
                "networks",
                "vpc-access",
                "connectors",
                "delete",
                name,
            ]);
            args.push(format!("--region={}", region));
            args
        }
        ResourceKind::SqlInstance => strings(&["sql", "instances", "delete", name]),
        ResourceKind::SqlDatabase | ResourceKind::SqlUser => {
            let instance = required(resource, &resource.parent, "instance")?;
            let noun = if resource.kind == ResourceKind::SqlDatabase {
                "databases"
            } else {
                "users"
            };
            let mut args = strings(&["sql", noun, "delete", name]);
            args.push(format!("--instance={}", instance));
            args
        }
        ResourceKind::Secret => strings(&["secrets", "delete", name]),
        ResourceKind::ArtifactRepo => {
            let region = required(resource, &resource.location, "location")?;
            let mut args = strings(&["artifacts", "repositories", "delete", name]);
            args.push(format!("--location={}", region));
            args
        }
        ResourceKind::Image => strings(&["artifacts", "docker", "images", "delete", name]),
        ResourceKind::RunService => {
            let region = required(resource, &resource.location, "region")?;
            let mut args = strings(&["run", "services", "delete", name]);
            args.push(format!("--region={}", region));
            args
        }
    };
    args.push("--quiet".to_string());
    Ok(args)
}

pub fn list_enabled_services() -> Vec<String> {
    strings(&["services", "list", "--enabled", "--format=value(config.name)"])
}

pub fn enable_services(services: &[String]) -> Vec<String> {
    let mut args = strings(&["services", "enable"]);
    args.extend(services.iter().cloned());
    args
}

/// Reads the secret value from stdin so it never appears in argv.
pub fn add_secret_version(secret: &str) -> Vec<String> {
    strings(&[
        "secrets",
        "versions",
        "add",
        secret,
        "--data-file=-",
        "--format=value(name)",
    ])
}

pub fn grant_role(binding: &RoleBinding) -> Vec<String> {
    let mut args = match &binding.scope {
        BindingScope::Project(project) => {
            strings(&["projects", "add-iam-policy-binding", project.as_str(), "--condition=None"])
        }
        BindingScope::Secret(secret) => strings(&["secrets", "add-iam-policy-binding", secret.as_str()]),
    };
    args.push(format!("--member={}", binding.member));
    args.push(format!("--role={}", binding.role));
    args.push("--format=none".to_string());
    args
}

pub fn submit_build(config: &Path, region: &str) -> Vec<String> {
    vec![
        "builds".to_string(),
        "submit".to_string(),
        "--no-source".to_string(),
        format!("--config={}", config.display()),
        format!("--region={}", region),
    ]
}

pub fn deploy_service(spec: &ServiceSpec) -> Result<Vec<String>, ProviderError> {
    let mut args = strings(&["run", "deploy", spec.name.as_str()]);
    args.push(format!("--image={}", spec.image));
    args.push(format!("--region={}", spec.region));
    args.push(format!("--port={}", spec.port));
    args.push(format!("--memory={}", spec.memory));
    args.push(format!("--cpu={}", spec.cpu));
    args.push(format!("--min-instances={}", spec.min_instances));
    args.push(format!("--max-instances={}", spec.max_instances));

    if let Some(connector) = &spec.connector {
        args.push(format!("--vpc-connector={}", connector));
    }
    if let Some(instance) = &spec.sql_instance {
        args.push(format!("--add-cloudsql-instances={}", instance));
    }
    if !spec.env.is_empty() {
        args.push(format!("--set-env-vars={}", join_pairs(&spec.env)?));
    }
    if !spec.secrets.is_empty() {
        let refs: BTreeMap<String, String> = spec
            .secrets
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect();
        args.push(format!("--set-secrets={}", join_pairs(&refs)?));
    }
    if let Some(account) = &spec.service_account {
        args.push(format!("--service-account={}", account));
    }
    args.push(
        if spec.allow_unauthenticated {
            "--allow-unauthenticated"
        } else {
            "--no-allow-unauthenticated"
        }
        .to_string(),
    );
    args.push("--quiet".to_string());
    Ok(args)
}

pub fn update_service_env(
    name: &str,
    region: &str,
    env: &BTreeMap<String, String>,
) -> Result<Vec<String>, ProviderError> {
    let mut args = strings(&["run", "services", "update", name]);
    args.push(format!("--region={}", region));
    args.push(format!("--update-env-vars={}", join_pairs(env)?));
    args.push("--quiet".to_string());
    Ok(args)
}

pub fn service_url(name: &str, region: &str) -> Vec<String> {
    let mut args = strings(&["run", "services", "describe", name]);
    args.push(format!("--region={}", region));
    args.push("--format=value(status.url)".to_string());
    args
}

pub fn read_logs(service: &str, region: &str, limit: u32) -> Vec<String> {
    let filter = format!(
        "resource.type=\"cloud_run_revision\" AND resource.labels.service_name=\"{}\" AND resource.labels.location=\"{}\"",
        service, region
    );
    vec![
        "logging".to_string(),
        "read".to_string(),
        filter,
        format!("--limit={}", limit),
        "--format=json".to_string(),
    ]
}

pub fn project_number(project: &str) -> Vec<String> {
    strings(&["projects", "describe", project, "--format=value(projectNumber)"])
}

pub fn active_project() -> Vec<String> {
    strings(&["config", "get-value", "project"])
}

pub fn version() -> Vec<String> {
    strings(&["--version"])
}

/// Join `KEY=VALUE` pairs with commas.
///
/// When a value contains a comma, the list is prefixed with `^D^` to switch to
/// an alternate delimiter `D` that appears nowhere in the pairs.
pub fn join_pairs(pairs: &BTreeMap<String, String>) -> Result<String, ProviderError> {
    let items: Vec<String> = pairs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();

    if !items.iter().any(|item| item.contains(',')) {
        return Ok(items.join(","));
    }

    const DELIMITERS: [char; 6] = ['@', '|', ';', '~', '#', '%'];
    let delimiter = DELIMITERS
        .iter()
        .find(|d| !items.iter().any(|item| item.contains(**d)))
        .ok_or_else(|| {
            ProviderError::Other("no free delimiter for environment values".to_string())
        })?;

    Ok(format!(
        "^{d}^{}",
        items.join(&delimiter.to_string()),
        d = delimiter
    ))
}
