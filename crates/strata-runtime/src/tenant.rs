//! Tenant onboarding.
//!
//! Each tenant gets its own application stack, created on first onboarding.
//! A second onboarding of the same tenant is refused unless the caller asks to
//! reuse the existing stack.

use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use strata_core::{Layer, StackOutputs, TenantAppConfig, TenantRequest};
use strata_policy::resolve_tenant_app_config;

use crate::engine::{EngineError, StackEngine, Stage};
use crate::error::ProvisionError;
use crate::events::{LayerReport, PipelineEvent, PipelineObserver, TracingObserver};
use crate::layers::{descriptor, project_upstream, tenant_config_map};
use crate::orchestrator::converge;

#[derive(Clone, Default)]
pub struct ProvisionOptions {
    pub admin_password: String,
    /// Select an existing tenant stack instead of failing.
    pub reuse_existing: bool,
}

impl fmt::Debug for ProvisionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionOptions")
            .field("admin_password", &"<redacted>")
            .field("reuse_existing", &self.reuse_existing)
            .finish()
    }
}

/// Outcome of onboarding one tenant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantReport {
    pub tenant_id: String,
    pub environment: String,
    pub reused: bool,
    #[serde(flatten)]
    pub layer: LayerReport,
}

impl TenantReport {
    pub fn stack(&self) -> &str {
        &self.layer.stack
    }

    pub fn outputs(&self) -> &StackOutputs {
        &self.layer.outputs
    }

    /// One-paragraph description for operators.
    pub fn summary(&self) -> String {
        let verb = if self.reused { "updated" } else { "onboarded" };
        let mut out = format!(
            "Tenant '{}' {} in {} (stack {}, {}).",
            self.tenant_id, verb, self.environment, self.layer.stack, self.layer.changes
        );
        if !self.layer.output_keys.is_empty() {
            out.push_str(&format!(" Outputs: {}.", self.layer.output_keys.join(", ")));
        }
        out
    }
}

pub struct TenantProvisioner<E: StackEngine, O: PipelineObserver = TracingObserver> {
    engine: E,
    observer: O,
    options: ProvisionOptions,
}

impl<E: StackEngine> TenantProvisioner<E> {
    pub fn new(engine: E, options: ProvisionOptions) -> Self {
        Self::with_observer(engine, TracingObserver, options)
    }
}

impl<E: StackEngine, O: PipelineObserver> TenantProvisioner<E, O> {
    pub fn with_observer(engine: E, observer: O, options: ProvisionOptions) -> Self {
        Self {
            engine,
            observer,
            options,
        }
    }

    /// Validate a raw tenant request, then provision it.
    pub async fn onboard(
        &self,
        request: &TenantRequest,
        platform: &StackOutputs,
    ) -> Result<TenantReport, ProvisionError> {
        let tenant = resolve_tenant_app_config(request)?;
        self.provision(&tenant, platform).await
    }

    /// Create (or reuse) the tenant stack, configure it and apply it.
    pub async fn provision(
        &self,
        tenant: &TenantAppConfig,
        platform: &StackOutputs,
    ) -> Result<TenantReport, ProvisionError> {
        let stack = tenant.stack_ref();
        let sources = BTreeMap::from([(Layer::Platform, platform.clone())]);
        let upstream = project_upstream(descriptor(Layer::Application), &sources).map_err(
            |source| ProvisionError::MissingUpstream {
                tenant_id: tenant.tenant_id.clone(),
                source,
            },
        )?;

        self.observer.on_event(&PipelineEvent::LayerStarted {
            layer: Layer::Application,
            stack: stack.name().to_string(),
        });

        let fail = |stage: Stage, source: EngineError| {
            self.observer.on_event(&PipelineEvent::LayerFailed {
                layer: Layer::Application,
                stack: stack.name().to_string(),
                stage,
                error: source.to_string(),
            });
            ProvisionError::Engine {
                tenant_id: tenant.tenant_id.clone(),
                stack: stack.name().to_string(),
                stage,
                source,
            }
        };

        let reused = match self.engine.create_stack(&stack).await {
            Ok(()) => false,
            Err(EngineError::AlreadyExists { .. }) if self.options.reuse_existing => {
                tracing::info!(
                    tenant = %tenant.tenant_id,
                    stack = %stack,
                    "Tenant stack exists, reusing it"
                );
                self.engine
                    .select_or_create_stack(&stack)
                    .await
                    .map_err(|e| fail(Stage::Select, e))?;
                true
            }
            Err(EngineError::AlreadyExists { .. }) => {
                return Err(ProvisionError::TenantAlreadyOnboarded {
                    tenant_id: tenant.tenant_id.clone(),
                    stack: stack.name().to_string(),
                });
            }
            Err(e) => return Err(fail(Stage::Create, e)),
        };

        let config = tenant_config_map(tenant, &self.options.admin_password);
        let layer = converge(&self.engine, &self.observer, &stack, config, upstream)
            .await
            .map_err(|(stage, e)| fail(stage, e))?;

        let report = TenantReport {
            tenant_id: tenant.tenant_id.clone(),
            environment: tenant.effective_name(),
            reused,
            layer,
        };
        tracing::info!(tenant = %report.tenant_id, stack = %report.stack(), "{}", report.summary());
        Ok(report)
    }

    /// Provision several tenants concurrently. A batch in which two tenants
    /// map to the same stack is rejected before any engine call.
    pub async fn provision_all(
        &self,
        tenants: &[TenantAppConfig],
        platform: &StackOutputs,
    ) -> Result<Vec<Result<TenantReport, ProvisionError>>, ProvisionError> {
        let mut seen = BTreeSet::new();
        for tenant in tenants {
            let stack = tenant.stack_ref();
            if !seen.insert(stack.name().to_string()) {
                return Err(ProvisionError::DuplicateStack {
                    stack: stack.name().to_string(),
                });
            }
        }

        Ok(join_all(tenants.iter().map(|t| self.provision(t, platform))).await)
    }
}
