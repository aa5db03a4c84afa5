use chrono::Utc;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use strata_core::{
    ChangeSummary, ConfigMap, DeploymentContext, DeploymentRequest, Layer, StackOutputs, StackRef,
    TenantAppConfig,
};
use strata_policy::resolve_deployment_context;
use uuid::Uuid;

use crate::engine::{EngineError, StackEngine, Stage};
use crate::error::PipelineError;
use crate::events::{LayerReport, PipelineEvent, PipelineObserver, PipelineReport, TracingObserver};
use crate::layers::{
    self, LayerDescriptor, PIPELINE, infrastructure_config, services_config, tenant_config_map,
};

/// Inputs of a run that do not come from the deployment context.
#[derive(Clone, Default)]
pub struct PipelineSettings {
    /// Add-on toggles written as `services:{name}`.
    pub services: BTreeMap<String, bool>,
    /// Database administrator password for the tenant application stack.
    pub admin_password: String,
}

impl fmt::Debug for PipelineSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineSettings")
            .field("services", &self.services)
            .field("admin_password", &"<redacted>")
            .finish()
    }
}

/// What a run would do for one layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerPlan {
    pub layer: Layer,
    pub stack: String,
    #[serde(serialize_with = "redacted")]
    pub config: ConfigMap,
    /// `upstream:` keys the layer will receive, with their source layer.
    pub upstream: Vec<(Layer, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelinePlan {
    pub environment: String,
    pub layers: Vec<LayerPlan>,
    pub skipped: Vec<Layer>,
}

fn redacted<S: Serializer>(config: &ConfigMap, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(config.iter().map(|(k, v)| (k, v.to_string())))
}

/// Stack and configuration for a layer; `None` when the layer is skipped.
fn layer_stack(
    ctx: &DeploymentContext,
    settings: &PipelineSettings,
    layer: Layer,
) -> Option<(StackRef, ConfigMap)> {
    let stack = ctx.stack_ref(layer)?;
    let config = match layer {
        Layer::Platform => infrastructure_config(ctx),
        Layer::Services => services_config(ctx, &settings.services),
        Layer::Application => {
            let tenant = TenantAppConfig::from_context(ctx)?;
            let mut config = tenant_config_map(&tenant, &settings.admin_password);
            config.extend(infrastructure_config(ctx));
            config
        }
    };
    Some((stack, config))
}

/// Every stack, configuration map and upstream key a run would write.
/// Needs no engine.
pub fn plan_pipeline(ctx: &DeploymentContext, settings: &PipelineSettings) -> PipelinePlan {
    let mut plan = PipelinePlan {
        environment: ctx.effective_name(),
        layers: Vec::new(),
        skipped: Vec::new(),
    };

    for descriptor in &PIPELINE {
        match layer_stack(ctx, settings, descriptor.layer) {
            Some((stack, config)) => plan.layers.push(LayerPlan {
                layer: descriptor.layer,
                stack: stack.name().to_string(),
                config,
                upstream: descriptor
                    .upstream
                    .iter()
                    .map(|b| (b.from, strata_core::keys::upstream(b.key)))
                    .collect(),
            }),
            None => plan.skipped.push(descriptor.layer),
        }
    }
    plan
}

/// Applies the platform, services and application layers in order.
pub struct Orchestrator<E: StackEngine, O: PipelineObserver = TracingObserver> {
    engine: E,
    observer: O,
    settings: PipelineSettings,
}

impl<E: StackEngine> Orchestrator<E> {
    pub fn new(engine: E, settings: PipelineSettings) -> Self {
        Self::with_observer(engine, TracingObserver, settings)
    }
}

impl<E: StackEngine, O: PipelineObserver> Orchestrator<E, O> {
    pub fn with_observer(engine: E, observer: O, settings: PipelineSettings) -> Self {
        Self {
            engine,
            observer,
            settings,
        }
    }

    /// Resolve every layer's stack, configuration and upstream keys without
    /// calling the engine.
    pub fn plan(&self, ctx: &DeploymentContext) -> PipelinePlan {
        plan_pipeline(ctx, &self.settings)
    }

    /// Validate a raw request, then run the pipeline.
    pub async fn deploy(&self, request: &DeploymentRequest) -> Result<PipelineReport, PipelineError> {
        let ctx = resolve_deployment_context(request)?;
        self.run(&ctx).await
    }

    /// Apply every layer in order, stopping at the first failure.
    pub async fn run(&self, ctx: &DeploymentContext) -> Result<PipelineReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        tracing::info!(
            %run_id,
            environment = %ctx.effective_name(),
            location = %ctx.location,
            tenant = ctx.tenant_id.as_deref().unwrap_or("-"),
            "Pipeline started"
        );

        let mut completed: Vec<LayerReport> = Vec::new();
        let mut outputs: BTreeMap<Layer, StackOutputs> = BTreeMap::new();
        let mut skipped = Vec::new();

        for descriptor in &PIPELINE {
            let layer = descriptor.layer;
            let Some((stack, config)) = layer_stack(ctx, &self.settings, layer) else {
                self.observer.on_event(&PipelineEvent::LayerSkipped {
                    layer,
                    reason: "no tenant id supplied".to_string(),
                });
                skipped.push(layer);
                continue;
            };

            let upstream = match layers::project_upstream(descriptor, &outputs) {
                Ok(upstream) => upstream,
                Err(source) => {
                    self.observer.on_event(&PipelineEvent::LayerFailed {
                        layer,
                        stack: stack.name().to_string(),
                        stage: Stage::Configure,
                        error: source.to_string(),
                    });
                    return Err(PipelineError::MissingUpstream {
                        layer,
                        source,
                        completed,
                    });
                }
            };

            let report = match self.apply_layer(descriptor, &stack, config, upstream).await {
                Ok(report) => report,
                Err((stage, source)) => {
                    self.observer.on_event(&PipelineEvent::LayerFailed {
                        layer,
                        stack: stack.name().to_string(),
                        stage,
                        error: source.to_string(),
                    });
                    return Err(PipelineError::Layer {
                        layer,
                        stack: stack.name().to_string(),
                        stage,
                        source,
                        completed,
                    });
                }
            };

            outputs.insert(layer, report.outputs.clone());
            completed.push(report);
        }

        let report = PipelineReport {
            run_id,
            environment: ctx.effective_name(),
            started_at,
            finished_at: Utc::now(),
            layers: completed,
            skipped,
        };
        tracing::info!(
            %run_id,
            applied = report.layers.len(),
            skipped = report.skipped.len(),
            "Pipeline finished"
        );
        Ok(report)
    }

    async fn apply_layer(
        &self,
        descriptor: &LayerDescriptor,
        stack: &StackRef,
        config: ConfigMap,
        upstream: ConfigMap,
    ) -> Result<LayerReport, (Stage, EngineError)> {
        self.observer.on_event(&PipelineEvent::LayerStarted {
            layer: descriptor.layer,
            stack: stack.name().to_string(),
        });

        self.engine
            .select_or_create_stack(stack)
            .await
            .map_err(|e| (Stage::Select, e))?;

        converge(&self.engine, &self.observer, stack, config, upstream).await
    }
}

/// Write configuration, preview and apply a stack that is already selected.
pub(crate) async fn converge<E, O>(
    engine: &E,
    observer: &O,
    stack: &StackRef,
    config: ConfigMap,
    upstream: ConfigMap,
) -> Result<LayerReport, (Stage, EngineError)>
where
    E: StackEngine + ?Sized,
    O: PipelineObserver + ?Sized,
{
    let layer = stack.layer();
    let keys = config.len();
    let forwarded = upstream.len();

    let mut all = config;
    all.extend(upstream);
    engine
        .set_config_map(stack, &all)
        .await
        .map_err(|e| (Stage::Configure, e))?;
    observer.on_event(&PipelineEvent::ConfigWritten {
        layer,
        stack: stack.name().to_string(),
        keys,
        upstream: forwarded,
    });

    let changes: ChangeSummary = engine
        .preview(stack)
        .await
        .map_err(|e| (Stage::Preview, e))?;
    observer.on_event(&PipelineEvent::Previewed {
        layer,
        stack: stack.name().to_string(),
        changes: changes.clone(),
    });

    let outputs = engine.up(stack).await.map_err(|e| (e.apply_stage(), e))?;
    observer.on_event(&PipelineEvent::Applied {
        layer,
        stack: stack.name().to_string(),
        outputs: outputs.len(),
    });

    Ok(LayerReport::new(layer, stack.name(), changes, outputs))
}
