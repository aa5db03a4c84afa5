//! Deployment context validation.
//!
//! Checks run in field order and each violated rule contributes exactly one
//! message:
//!
//! 1. `org`, `project`, `environment`, `location` are required
//! 2. `environment` is one of `dev`, `test`, `staging`, `prod`, `pr`
//! 3. `ephemeralId` is set exactly when `environment` is `pr`
//! 4. `deploymentSlot` is `blue`/`green` and only used with `prod`
//! 5. `tenantId`, when set, is a lowercase DNS label

use strata_core::{DeploymentContext, DeploymentRequest};

use crate::error::{ConfigurationError, ValidationReport};
use crate::rules::{check_environment, check_tenant_id, present, require};

/// Validate a deployment request without failing fast.
pub fn validate_deployment_context(request: &DeploymentRequest) -> ValidationReport {
    collect(request).0
}

/// Validate a deployment request and build the typed context.
pub fn resolve_deployment_context(
    request: &DeploymentRequest,
) -> Result<DeploymentContext, ConfigurationError> {
    let (report, target) = collect(request);
    report.into_result()?;

    let target = target.ok_or_else(|| {
        ConfigurationError::single("environment could not be resolved")
    })?;

    let context = DeploymentContext {
        org: request.org.trim().to_string(),
        project: request.project.trim().to_string(),
        target,
        location: request.location.trim().to_string(),
        tenant_id: present(request.tenant_id.as_deref()).map(str::to_string),
    };

    tracing::debug!(
        environment = %context.effective_name(),
        tier = %context.cluster_tier(),
        location = %context.location,
        tenant = context.tenant_id.as_deref().unwrap_or("-"),
        "Deployment context resolved"
    );

    Ok(context)
}

fn collect(
    request: &DeploymentRequest,
) -> (ValidationReport, Option<strata_core::ResolvedEnvironment>) {
    let mut report = ValidationReport::new();

    require(&mut report, "org", &request.org);
    require(&mut report, "project", &request.project);
    let target = check_environment(
        &mut report,
        &request.environment,
        request.ephemeral_id.as_deref(),
        request.deployment_slot.as_deref(),
    );
    require(&mut report, "location", &request.location);

    if let Some(tenant_id) = present(request.tenant_id.as_deref()) {
        check_tenant_id(&mut report, tenant_id);
    }

    (report, target)
}
