// ABOUTME: Runs the gcloud CLI and classifies its failures.
// ABOUTME: Maps stderr text to matched error kinds instead of blanket suppression.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::provider::{ProviderError, ResourceKind};

/// Output from a finished CLI invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Thin wrapper over the `gcloud` executable.
#[derive(Debug, Clone)]
pub struct GcloudCli {
    program: String,
}

impl GcloudCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run to completion, optionally feeding `stdin`. Never times out.
    pub async fn run(
        &self,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<CommandOutput, ProviderError> {
        tracing::debug!("{} {}", self.program, redact(args).join(" "));

        let spawn_err = |source| ProviderError::Spawn {
            program: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_err)?;

        if let Some(data) = stdin
            && let Some(mut pipe) = child.stdin.take()
        {
            pipe.write_all(data).await.map_err(spawn_err)?;
            // Close stdin so the CLI sees EOF.
            drop(pipe);
        }

        let output = child.wait_with_output().await.map_err(spawn_err)?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Run and return stdout, converting a non-zero exit into a classified error.
    pub async fn run_checked(
        &self,
        args: &[String],
        stdin: Option<&[u8]>,
        subject: &str,
    ) -> Result<String, ProviderError> {
        let output = self.run(args, stdin).await?;
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(classify(subject, &output.stderr))
        }
    }
}

/// Classify a failed call from its stderr.
pub fn classify(subject: &str, stderr: &str) -> ProviderError {
    let lower = stderr.to_ascii_lowercase();
    let detail = stderr
        .lines()
        .map(str::trim)
        .rfind(|l| !l.is_empty())
        .unwrap_or("no error output");
    let message = format!("{}: {}", subject, detail);

    // Only connector creation carries a caller-chosen range.
    let is_connector = subject.starts_with(ResourceKind::Connector.as_str());
    let mentions_range = lower.contains("range") || lower.contains("cidr");
    if is_connector
        && mentions_range
        && (lower.contains("already in use")
            || lower.contains("overlap")
            || lower.contains("conflict"))
    {
        return ProviderError::AddressInUse(message);
    }

    if lower.contains("not_found")
        || lower.contains("not found")
        || lower.contains("does not exist")
        || lower.contains("(404)")
    {
        return ProviderError::NotFound(message);
    }

    if lower.contains("already_exists")
        || lower.contains("already exists")
        || lower.contains("(409)")
    {
        return ProviderError::AlreadyExists(message);
    }

    if lower.contains("permission_denied")
        || lower.contains("permission denied")
        || lower.contains("does not have permission")
        || lower.contains("(403)")
    {
        return ProviderError::PermissionDenied(message);
    }

    ProviderError::Other(message)
}

/// Hide inline passwords from debug logs.
fn redact(args: &[String]) -> Vec<String> {
    args.iter()
        .map(|a| {
            if a.starts_with("--password=") {
                "--password=***".to_string()
            } else {
                a.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderErrorKind;

    #[test]
    fn classifies_not_found() {
        let err = classify(
            "sql-instance n8n-db",
            "ERROR: (gcloud.sql.instances.describe) HTTPError 404: The Cloud SQL instance does not exist.\n",
        );
        assert_eq!(err.kind(), ProviderErrorKind::NotFound);
        assert!(err.to_string().contains("sql-instance n8n-db"));
    }

    #[test]
    fn classifies_already_exists() {
        let err = classify("secret s", "ERROR: ALREADY_EXISTS: Secret [s] already exists.");
        assert_eq!(err.kind(), ProviderErrorKind::AlreadyExists);
    }

    #[test]
    fn classifies_permission_denied() {
        let err = classify(
            "sql-instance n8n-db",
            "ERROR: (gcloud.sql.instances.delete) PERMISSION_DENIED: The caller does not have permission",
        );
        assert_eq!(err.kind(), ProviderErrorKind::PermissionDenied);
    }

    #[test]
    fn classifies_range_conflict() {
        let err = classify(
            "connector c",
            "ERROR: (gcloud.compute.networks.vpc-access.connectors.create) The IP range 10.8.0.0/28 is already in use.",
        );
        assert_eq!(err.kind(), ProviderErrorKind::AddressInUse);
    }

    #[test]
    fn range_conflict_outside_connector_is_not_address_in_use() {
        let err = classify(
            "address-reservation google-managed-services-default",
            "ERROR: (gcloud.compute.addresses.create) HTTPError 409: The range overlaps with an existing conflict.",
        );
        assert_ne!(err.kind(), ProviderErrorKind::AddressInUse);
    }

    #[test]
    fn unknown_failures_are_other() {
        let err = classify("build", "ERROR: build step 1 failed\n\n");
        assert_eq!(err.kind(), ProviderErrorKind::Other);
        assert!(err.to_string().ends_with("ERROR: build step 1 failed"));
    }

    #[test]
    fn redacts_password_argument() {
        let args = vec!["sql".to_string(), "--password=hunter2".to_string()];
        assert_eq!(redact(&args), vec!["sql", "--password=***"]);
    }
}
