// ABOUTME: End-to-end pipeline runs against an in-memory provider.
// ABOUTME: Covers idempotent reruns, destructive modes, overrides, secrets, and resumable deploys.

mod support;

use runway::diagnostics::WarningKind;
use runway::pipeline::PipelineErrorKind;
use runway::provider::ResourceKind;
use runway::steps::StepErrorKind;
use support::{Call, Harness};

const INSTANCE: &str = "n8n-db";
const DATABASE: &str = "n8n";
const USER: &str = "n8n-user";
const ENCRYPTION_SECRET: &str = "n8n-encryption-key";
const DB_PASSWORD_SECRET: &str = "n8n-db-password";

// =============================================================================
// Idempotence
// =============================================================================

#[tokio::test]
async fn first_run_provisions_everything() {
    let h = Harness::new();

    let report = h.run(&[]).await.unwrap();

    assert_eq!(
        report.steps_run,
        vec!["network", "database", "secrets", "image", "service"]
    );
    assert!(report.warnings.is_empty());
    assert_eq!(h.state("PROJECT_ID").as_deref(), Some("acme"));
    assert_eq!(h.state("DEPLOY_STAGE").as_deref(), Some("configured"));
    assert_eq!(
        h.state("SERVICE_URL").as_deref(),
        Some("https://n8n-abc123-uc.a.run.app")
    );
    assert_eq!(
        h.state("DB_CONNECTION_NAME").as_deref(),
        Some("acme:us-central1:n8n-db")
    );
    assert!(h.provider.generation(ResourceKind::SqlInstance, INSTANCE, None).is_some());
}

#[tokio::test]
async fn second_run_in_ignore_mode_creates_and_deletes_nothing() {
    let h = Harness::new();
    h.run(&[]).await.unwrap();
    let password = h.state("DB_PASSWORD");
    h.provider.clear_calls();

    h.run(&[]).await.unwrap();

    assert!(h.provider.creates().is_empty(), "created {:?}", h.provider.creates());
    assert!(h.provider.deletes().is_empty(), "deleted {:?}", h.provider.deletes());
    assert_eq!(h.state("DB_PASSWORD"), password);
}

#[tokio::test]
async fn already_enabled_services_are_not_enabled_again() {
    let h = Harness::new();
    h.run(&[]).await.unwrap();
    h.provider.clear_calls();

    h.run(&["STEPS=network"]).await.unwrap();

    assert!(
        !h.provider
            .calls()
            .iter()
            .any(|c| matches!(c, Call::EnableServices(_)))
    );
}

// =============================================================================
// Action modes
// =============================================================================

#[tokio::test]
async fn drop_recreates_database_and_user_on_the_same_instance() {
    let h = Harness::new();
    h.run(&[]).await.unwrap();
    let instance = h.provider.generation(ResourceKind::SqlInstance, INSTANCE, None);
    let database = h
        .provider
        .generation(ResourceKind::SqlDatabase, DATABASE, Some(INSTANCE));
    h.provider.clear_calls();

    h.run(&["DB_ACTION=drop"]).await.unwrap();

    let deletes = h.provider.deletes();
    assert!(deletes.iter().any(|k| k.starts_with("sql-database:")));
    assert!(deletes.iter().any(|k| k.starts_with("sql-user:")));
    assert!(!deletes.iter().any(|k| k.starts_with("sql-instance:")));
    assert_eq!(
        h.provider.generation(ResourceKind::SqlInstance, INSTANCE, None),
        instance
    );
    assert_ne!(
        h.provider
            .generation(ResourceKind::SqlDatabase, DATABASE, Some(INSTANCE)),
        database
    );

    // Back to ignore mode: nothing further changes.
    h.provider.clear_calls();
    h.run(&[]).await.unwrap();
    assert!(h.provider.creates().is_empty());
}

#[tokio::test]
async fn destroy_recreates_the_instance_with_a_new_password() {
    let h = Harness::new();
    h.run(&[]).await.unwrap();
    let instance = h.provider.generation(ResourceKind::SqlInstance, INSTANCE, None);
    let old_password = h.state("DB_PASSWORD").unwrap();

    h.run(&["DB_ACTION=destroy"]).await.unwrap();

    let new_password = h.state("DB_PASSWORD").unwrap();
    assert_ne!(new_password, old_password);
    assert_ne!(
        h.provider.generation(ResourceKind::SqlInstance, INSTANCE, None),
        instance
    );
    let user_key = support::fake_provider::key(ResourceKind::SqlUser, USER, Some(INSTANCE));
    assert_eq!(
        h.provider.with(|c| c.user_passwords.get(&user_key).cloned()),
        Some(new_password.clone())
    );
    let versions = h.provider.secret_versions(DB_PASSWORD_SECRET);
    assert_eq!(versions.last().map(Vec::as_slice), Some(new_password.as_bytes()));
}

#[tokio::test]
async fn failed_destructive_delete_is_only_a_warning() {
    let h = Harness::new();
    h.run(&[]).await.unwrap();
    h.provider.with(|c| c.deny_delete = true);
    h.provider.clear_calls();

    let report = h.run(&["DB_ACTION=drop"]).await.unwrap();

    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::DestructiveDelete)
    );
    assert!(h.provider.creates().is_empty());
}

#[tokio::test]
async fn missing_password_for_existing_instance_fails_without_mutation() {
    let h = Harness::new();
    h.provider.seed(ResourceKind::SqlInstance, INSTANCE, None);

    let err = h
        .run(&["STEPS=database", "PROJECT_ID=acme"])
        .await
        .unwrap_err();

    assert_eq!(err.step(), Some("database"));
    assert_eq!(
        err.step_error().map(|e| e.kind()),
        Some(StepErrorKind::MissingPrecondition)
    );
    assert!(err.to_string().contains("DB_PASSWORD"));
    assert!(h.provider.calls().iter().all(|c| !c.is_mutation()));
    assert!(h.state("DB_PASSWORD").is_none());
}

#[tokio::test]
async fn password_override_allows_adopting_an_existing_instance() {
    let h = Harness::new();
    h.provider.seed(ResourceKind::SqlInstance, INSTANCE, None);

    h.run(&["STEPS=database", "PROJECT_ID=acme", "DB_PASSWORD=known-secret"])
        .await
        .unwrap();

    let user_key = support::fake_provider::key(ResourceKind::SqlUser, USER, Some(INSTANCE));
    assert_eq!(
        h.provider.with(|c| c.user_passwords.get(&user_key).cloned()).as_deref(),
        Some("known-secret")
    );
}

// =============================================================================
// Overrides
// =============================================================================

#[tokio::test]
async fn overrides_are_visible_to_every_step() {
    let h = Harness::new();
    h.run(&[]).await.unwrap();
    h.provider.clear_calls();

    h.run(&["DB_ACTION=drop_db", "REGION=test-region"]).await.unwrap();

    // Drop mode reached the database step.
    assert!(h.provider.deletes().iter().any(|k| k.starts_with("sql-database:")));
    // The region reached every regional resource.
    let connector_created = h.provider.with(|c| {
        c.created.iter().any(|spec| {
            matches!(spec, runway::provider::ResourceSpec::Connector { region, .. } if region == "test-region")
        })
    });
    assert!(connector_created);
    assert_eq!(h.state("REGION").as_deref(), Some("test-region"));
    // The instance already existed, so it stays where it was created.
    assert_eq!(
        h.state("DB_CONNECTION_NAME").as_deref(),
        Some("acme:us-central1:n8n-db")
    );
    assert!(h.state("IMAGE_URL").unwrap().starts_with("test-region-docker.pkg.dev/acme/"));
    assert_eq!(h.provider.last_deployed().unwrap().region, "test-region");
}

#[tokio::test]
async fn existing_instance_keeps_its_own_connection_name() {
    let h = Harness::new();
    h.provider.seed_instance(INSTANCE, "europe-west1");

    h.run(&["DB_PASSWORD=known-secret", "REGION=us-east1"])
        .await
        .unwrap();

    assert_eq!(
        h.state("DB_CONNECTION_NAME").as_deref(),
        Some("acme:europe-west1:n8n-db")
    );
    assert_eq!(
        h.provider.last_deployed().unwrap().sql_instance.as_deref(),
        Some("acme:europe-west1:n8n-db")
    );
}

#[tokio::test]
async fn unknown_steps_are_skipped_with_a_warning() {
    let h = Harness::new();

    let report = h.run(&["STEPS=network,monitoring"]).await.unwrap();

    assert_eq!(report.steps_run, vec!["network"]);
    assert_eq!(report.steps_skipped, vec!["monitoring".to_string()]);
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::UnknownStep && w.message.contains("monitoring"))
    );
}

// =============================================================================
// Secrets
// =============================================================================

#[tokio::test]
async fn encryption_key_gets_a_new_version_every_run_and_is_never_stored() {
    let h = Harness::new();
    h.run(&[]).await.unwrap();
    h.run(&[]).await.unwrap();

    let versions = h.provider.secret_versions(ENCRYPTION_SECRET);
    assert_eq!(versions.len(), 2);
    assert_ne!(versions[0], versions[1]);

    let state_file = std::fs::read_to_string(h.state_path()).unwrap();
    for version in &versions {
        let key = String::from_utf8(version.clone()).unwrap();
        assert!(!state_file.contains(&key));
    }
}

#[tokio::test]
async fn deployed_service_reads_credentials_only_through_secrets() {
    let h = Harness::new();
    h.run(&[]).await.unwrap();
    let password = h.state("DB_PASSWORD").unwrap();

    let spec = h.provider.last_deployed().unwrap();

    assert!(spec.env.values().all(|v| *v != password));
    for var in [
        "DB_POSTGRESDB_PASSWORD",
        "N8N_ENCRYPTION_KEY",
        "N8N_BASIC_AUTH_PASSWORD",
    ] {
        assert!(spec.secrets.contains_key(var), "{} not bound", var);
        assert!(!spec.env.contains_key(var));
    }
}

#[tokio::test]
async fn access_is_granted_before_the_service_is_deployed() {
    let h = Harness::new();
    h.run(&[]).await.unwrap();

    let calls = h.provider.calls();
    let last_grant = calls
        .iter()
        .rposition(|c| matches!(c, Call::GrantRole(_)))
        .unwrap();
    let deploy = calls
        .iter()
        .position(|c| matches!(c, Call::Deploy(_)))
        .unwrap();
    assert!(last_grant < deploy);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn connector_range_conflict_is_fatal_with_a_hint() {
    let h = Harness::new();
    h.provider.with(|c| c.range_in_use = true);

    let err = h.run(&[]).await.unwrap_err();

    assert_eq!(err.step(), Some("network"));
    assert_eq!(
        err.step_error().map(|e| e.kind()),
        Some(StepErrorKind::ConnectorRangeInUse)
    );
    assert!(err.to_string().contains("CONNECTOR_RANGE="));
}

#[tokio::test]
async fn missing_service_address_fails_after_deploy() {
    let h = Harness::new();
    h.provider.with(|c| c.no_url = true);

    let err = h.run(&[]).await.unwrap_err();

    assert_eq!(
        err.step_error().map(|e| e.kind()),
        Some(StepErrorKind::PostDeployVerification)
    );
    assert_eq!(h.state("DEPLOY_STAGE").as_deref(), Some("created"));
    assert!(h.state("SERVICE_URL").is_none());
}

#[tokio::test]
async fn interrupted_deploy_resumes_without_redeploying() {
    let h = Harness::new();
    h.provider.with(|c| c.no_url = true);
    h.run(&[]).await.unwrap_err();

    h.provider.with(|c| c.no_url = false);
    h.provider.clear_calls();
    h.run(&[]).await.unwrap();

    let calls = h.provider.calls();
    assert!(!calls.iter().any(|c| matches!(c, Call::Deploy(_))));
    assert!(calls.iter().any(|c| matches!(c, Call::UpdateEnv(_))));
    assert_eq!(h.state("DEPLOY_STAGE").as_deref(), Some("configured"));
}

#[tokio::test]
async fn deleted_service_is_deployed_again_instead_of_resumed() {
    let h = Harness::new();
    h.provider.with(|c| c.no_url = true);
    h.run(&[]).await.unwrap_err();
    assert_eq!(h.state("DEPLOY_STAGE").as_deref(), Some("created"));

    h.provider.remove_service("n8n");
    h.provider.with(|c| c.no_url = false);
    h.provider.clear_calls();
    h.run(&[]).await.unwrap();

    let calls = h.provider.calls();
    let grant = calls.iter().position(|c| matches!(c, Call::GrantRole(_)));
    let deploy = calls.iter().position(|c| matches!(c, Call::Deploy(_)));
    assert!(grant.is_some() && deploy.is_some());
    assert!(grant < deploy);
    assert_eq!(h.state("DEPLOY_STAGE").as_deref(), Some("configured"));
    assert_eq!(
        h.state("SERVICE_URL").as_deref(),
        Some("https://n8n-abc123-uc.a.run.app")
    );
}

#[tokio::test]
async fn known_address_resumes_at_configuration() {
    let h = Harness::new();
    h.run(&[]).await.unwrap();
    h.store().put("DEPLOY_STAGE", "address-known").unwrap();
    h.provider.clear_calls();

    h.run(&["STEPS=service"]).await.unwrap();

    let calls = h.provider.calls();
    assert!(!calls.iter().any(|c| matches!(c, Call::Deploy(_) | Call::ServiceUrl(_))));
    assert_eq!(
        calls
            .iter()
            .filter(|c| matches!(c, Call::UpdateEnv(_)))
            .count(),
        1
    );
    let env = h
        .provider
        .with(|c| c.service_env.get("n8n").cloned())
        .unwrap();
    assert_eq!(
        env.get("WEBHOOK_URL").map(String::as_str),
        Some("https://n8n-abc123-uc.a.run.app/")
    );
}

#[tokio::test]
async fn unsupported_context_runs_nothing() {
    let h = Harness::new();
    h.provider.with(|c| c.unsupported = true);

    let err = h.run(&[]).await.unwrap_err();

    assert_eq!(err.kind(), PipelineErrorKind::Unsupported);
    assert!(h.provider.calls().is_empty());
    assert!(!h.state_path().exists());
}

#[tokio::test]
async fn missing_project_is_a_precondition_failure() {
    let h = Harness::new();
    h.provider.with(|c| c.active_project = None);

    let err = h.run(&[]).await.unwrap_err();

    assert_eq!(err.step(), Some("network"));
    assert_eq!(
        err.step_error().map(|e| e.kind()),
        Some(StepErrorKind::MissingPrecondition)
    );
    assert!(h.provider.calls().iter().all(|c| !c.is_mutation()));
}
