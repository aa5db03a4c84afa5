//! Pipeline tests against the in-memory stack engine.
//!
//! Run with:
//!   cargo test -p strata-runtime --test pipeline

use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use strata_core::{
    BaseEnvironment, DeploymentContext, DeploymentRequest, DeploymentSlot, Layer,
    ResolvedEnvironment, StackOutputs,
};
use strata_runtime::{
    EngineCall, InMemoryStackEngine, Orchestrator, PipelineError, PipelineEvent, PipelineSettings,
    RecordingObserver, Stage,
};

// =============================================================================
// FIXTURES
// =============================================================================

fn platform_outputs() -> StackOutputs {
    StackOutputs::from_iter([
        ("resourceGroupName", json!("rg-contoso-dev")),
        ("vnetId", json!("/subscriptions/s/vnets/dev")),
        ("clusterId", json!("/subscriptions/s/clusters/dev")),
        ("clusterName", json!("aks-dev")),
        ("databaseServerName", json!("psql-dev")),
        ("keyVaultUri", json!("https://kv-dev.vault.azure.net/")),
        ("nodeCount", json!(3)),
    ])
}

fn context(target: ResolvedEnvironment, tenant: Option<&str>) -> DeploymentContext {
    DeploymentContext {
        org: "contoso".to_string(),
        project: "landing-zone".to_string(),
        target,
        location: "eastus".to_string(),
        tenant_id: tenant.map(str::to_string),
    }
}

fn dev(tenant: Option<&str>) -> DeploymentContext {
    context(ResolvedEnvironment::base(BaseEnvironment::Dev), tenant)
}

fn settings() -> PipelineSettings {
    PipelineSettings {
        services: BTreeMap::from([("enableIngress".to_string(), true)]),
        admin_password: "correct-horse".to_string(),
    }
}

fn engine() -> Arc<InMemoryStackEngine> {
    Arc::new(InMemoryStackEngine::new().with_layer_outputs(Layer::Platform, platform_outputs()))
}

// =============================================================================
// ORDERING AND SKIPPING
// =============================================================================

#[tokio::test]
async fn test_full_pipeline_applies_layers_in_order() {
    let engine = engine();
    let orchestrator = Orchestrator::new(engine.clone(), settings());

    let report = orchestrator.run(&dev(Some("acme"))).await.unwrap();

    assert_eq!(
        report.applied_stacks(),
        vec![
            "platform-dev-eastus",
            "services-dev-eastus",
            "app-acme-dev-eastus"
        ]
    );
    assert!(report.skipped.is_empty());
    assert_eq!(report.environment, "dev");
    assert!(report.finished_at >= report.started_at);

    let ups: Vec<String> = engine
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            EngineCall::Up(stack) => Some(stack),
            _ => None,
        })
        .collect();
    assert_eq!(
        ups,
        vec![
            "platform-dev-eastus".to_string(),
            "services-dev-eastus".to_string(),
            "app-acme-dev-eastus".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_no_tenant_skips_application_layer() {
    let engine = engine();
    let observer = Arc::new(RecordingObserver::new());
    let orchestrator = Orchestrator::with_observer(engine.clone(), observer.clone(), settings());

    let report = orchestrator.run(&dev(None)).await.unwrap();

    assert_eq!(report.layers.len(), 2);
    assert_eq!(report.skipped, vec![Layer::Application]);
    assert!(
        engine
            .calls()
            .iter()
            .all(|call| !call.stack().starts_with("app-"))
    );
    assert!(observer.events().iter().any(|e| matches!(
        e,
        PipelineEvent::LayerSkipped {
            layer: Layer::Application,
            ..
        }
    )));
}

#[tokio::test]
async fn test_production_slot_stack_names() {
    let engine = engine();
    let orchestrator = Orchestrator::new(engine.clone(), settings());
    let ctx = context(ResolvedEnvironment::prod_slot(DeploymentSlot::Green), Some("acme"));

    let report = orchestrator.run(&ctx).await.unwrap();

    assert_eq!(
        report.applied_stacks(),
        vec![
            "platform-prod-green-eastus",
            "services-prod-green-eastus",
            "app-acme-prod-green-eastus"
        ]
    );
    let platform = engine.config("platform-prod-green-eastus").unwrap();
    assert_eq!(platform.value("infrastructure:clusterType"), Some("prod"));
    assert_eq!(platform.value("infrastructure:environment"), Some("prod-green"));
}

// =============================================================================
// FAILURE HANDLING
// =============================================================================

#[tokio::test]
async fn test_services_failure_stops_pipeline() {
    let engine = Arc::new(
        InMemoryStackEngine::new()
            .with_layer_outputs(Layer::Platform, platform_outputs())
            .fail_at("services-dev-eastus", Stage::Apply),
    );
    let orchestrator = Orchestrator::new(engine.clone(), settings());

    let err = orchestrator.run(&dev(Some("acme"))).await.unwrap_err();

    match &err {
        PipelineError::Layer {
            layer,
            stack,
            stage,
            completed,
            ..
        } => {
            assert_eq!(*layer, Layer::Services);
            assert_eq!(stack, "services-dev-eastus");
            assert_eq!(*stage, Stage::Apply);
            assert_eq!(completed.len(), 1);
            assert_eq!(completed[0].stack, "platform-dev-eastus");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.layer(), Some(Layer::Services));
    assert_eq!(engine.applied(), vec!["platform-dev-eastus".to_string()]);
    assert!(engine.calls_for("app-acme-dev-eastus").is_empty());
}

#[tokio::test]
async fn test_preview_failure_is_reported_with_stage() {
    let engine = Arc::new(InMemoryStackEngine::new().fail_at("platform-dev-eastus", Stage::Preview));
    let orchestrator = Orchestrator::new(engine.clone(), settings());

    let err = orchestrator.run(&dev(None)).await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Preview));
    assert!(err.completed().is_empty());
    assert!(engine.applied().is_empty());
    assert!(err.to_string().contains("platform-dev-eastus"));
}

#[tokio::test]
async fn test_output_read_failure_after_apply_is_not_an_apply_failure() {
    let engine = Arc::new(
        InMemoryStackEngine::new()
            .with_layer_outputs(Layer::Platform, platform_outputs())
            .fail_at("platform-dev-eastus", Stage::Outputs),
    );
    let orchestrator = Orchestrator::new(engine.clone(), settings());

    let err = orchestrator.run(&dev(None)).await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Outputs));
    assert_eq!(engine.applied(), vec!["platform-dev-eastus".to_string()]);
    assert!(engine.calls_for("services-dev-eastus").is_empty());
    assert!(err.to_string().contains("outputs"), "{err}");
}

#[tokio::test]
async fn test_missing_upstream_aborts_before_stack_is_selected() {
    let engine = Arc::new(InMemoryStackEngine::new().with_layer_outputs(
        Layer::Platform,
        StackOutputs::from_iter([("resourceGroupName", json!("rg"))]),
    ));
    let orchestrator = Orchestrator::new(engine.clone(), settings());

    let err = orchestrator.run(&dev(None)).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::MissingUpstream {
            layer: Layer::Services,
            ..
        }
    ));
    assert_eq!(err.completed().len(), 1);
    assert!(engine.calls_for("services-dev-eastus").is_empty());
}

#[tokio::test]
async fn test_invalid_request_never_reaches_engine() {
    let engine = engine();
    let orchestrator = Orchestrator::new(engine.clone(), settings());

    let request = DeploymentRequest::new("contoso", "lz", "pr", "eastus");
    let err = orchestrator.deploy(&request).await.unwrap_err();

    assert!(matches!(err, PipelineError::Configuration(_)));
    assert!(engine.calls().is_empty());
}

// =============================================================================
// CONFIGURATION AND UPSTREAM FORWARDING
// =============================================================================

#[tokio::test]
async fn test_upstream_values_are_prefixed_and_filtered() {
    let engine = engine();
    let orchestrator = Orchestrator::new(engine.clone(), settings());

    orchestrator.run(&dev(Some("acme"))).await.unwrap();

    let services = engine.config("services-dev-eastus").unwrap();
    assert_eq!(services.value("upstream:clusterName"), Some("aks-dev"));
    assert_eq!(
        services.value("upstream:vnetId"),
        Some("/subscriptions/s/vnets/dev")
    );
    assert!(!services.contains_key("upstream:nodeCount"));
    assert!(!services.contains_key("upstream:keyVaultUri"));
    assert_eq!(services.value("services:enableIngress"), Some("true"));

    let app = engine.config("app-acme-dev-eastus").unwrap();
    assert_eq!(
        app.value("upstream:keyVaultUri"),
        Some("https://kv-dev.vault.azure.net/")
    );
    assert_eq!(app.value("upstream:databaseServerName"), Some("psql-dev"));
    assert!(!app.contains_key("upstream:vnetId"));
    assert_eq!(app.value("infrastructure:tenantId"), Some("acme"));
    assert!(app.get("database:administratorPassword").unwrap().secret);
}

#[tokio::test]
async fn test_observer_sees_every_transition() {
    let engine = engine();
    let observer = Arc::new(RecordingObserver::new());
    let orchestrator = Orchestrator::with_observer(engine, observer.clone(), settings());

    orchestrator.run(&dev(None)).await.unwrap();

    let kinds: Vec<&'static str> = observer
        .events()
        .iter()
        .map(|e| match e {
            PipelineEvent::LayerStarted { .. } => "started",
            PipelineEvent::ConfigWritten { .. } => "config",
            PipelineEvent::Previewed { .. } => "preview",
            PipelineEvent::Applied { .. } => "applied",
            PipelineEvent::LayerSkipped { .. } => "skipped",
            PipelineEvent::LayerFailed { .. } => "failed",
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "started", "config", "preview", "applied", "started", "config", "preview", "applied",
            "skipped"
        ]
    );
}

#[tokio::test]
async fn test_rerun_is_idempotent_for_shared_layers() {
    let engine = engine();
    let orchestrator = Orchestrator::new(engine.clone(), settings());

    orchestrator.run(&dev(None)).await.unwrap();
    let second = orchestrator.run(&dev(None)).await.unwrap();

    let platform = second.layer(Layer::Platform).unwrap();
    assert_eq!(platform.changes.count("same"), 1);
    assert!(!platform.changes.has_changes());
    assert_ne!(second.run_id.to_string(), "");
    assert!(engine.calls().iter().any(|c| matches!(c, EngineCall::SelectOrCreate(_))));
}
