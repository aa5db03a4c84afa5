//! Rules shared by the deployment and tenant validators.

use regex::Regex;
use std::sync::LazyLock;

use strata_core::{DeploymentSlot, Environment, EphemeralId, ResolvedEnvironment};

use crate::error::ValidationReport;

/// Longest tenant id accepted; stack names and namespaces embed it.
pub const MAX_TENANT_ID_LEN: usize = 40;

static TENANT_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").expect("tenant id pattern compiles")
});

/// Treat blank strings as absent (unset environment variables often arrive as "").
pub(crate) fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn require(report: &mut ValidationReport, field: &str, value: &str) {
    if value.trim().is_empty() {
        report.push(format!("{field} is required"));
    }
}

pub(crate) fn check_tenant_id(report: &mut ValidationReport, tenant_id: &str) {
    if tenant_id.len() > MAX_TENANT_ID_LEN || !TENANT_ID_PATTERN.is_match(tenant_id) {
        report.push(format!(
            "tenantId '{tenant_id}' must be a lowercase DNS label (a-z, 0-9, '-') of at most {MAX_TENANT_ID_LEN} characters"
        ));
    }
}

/// Check environment, ephemeral id and slot together. Each violated rule adds
/// exactly one message. Returns the resolved target when all rules hold.
///
/// An empty or unknown environment suppresses the rules that depend on it.
pub(crate) fn check_environment(
    report: &mut ValidationReport,
    environment: &str,
    ephemeral_id: Option<&str>,
    slot: Option<&str>,
) -> Option<ResolvedEnvironment> {
    let errors_before = report.errors().len();
    let ephemeral_id = present(ephemeral_id);
    let slot_raw = present(slot);

    let environment = match environment.trim() {
        "" => {
            report.push("environment is required");
            None
        }
        tag => match tag.parse::<Environment>() {
            Ok(env) => Some(env),
            Err(_) => {
                report.push(format!(
                    "environment '{tag}' is not one of dev, test, staging, prod, pr"
                ));
                None
            }
        },
    };

    let slot = match slot_raw {
        None => None,
        Some(raw) => match raw.parse::<DeploymentSlot>() {
            Ok(slot) => Some(slot),
            Err(_) => {
                report.push(format!("deploymentSlot '{raw}' must be blue or green"));
                None
            }
        },
    };

    let environment = environment?;

    match (environment, ephemeral_id) {
        (Environment::Ephemeral, None) => {
            report.push("ephemeralId is required when environment is 'pr'");
        }
        (Environment::Base(_), Some(_)) => {
            report.push(format!(
                "ephemeralId must not be set when environment is '{environment}'"
            ));
        }
        _ => {}
    }

    if let Some(slot) = slot {
        if !environment.is_prod() {
            report.push(format!(
                "deploymentSlot '{slot}' is only allowed when environment is 'prod' (got '{environment}')"
            ));
        }
    }

    if report.errors().len() != errors_before {
        return None;
    }

    let ephemeral_id = ephemeral_id.and_then(|id| EphemeralId::new(id).ok());
    ResolvedEnvironment::new(environment, ephemeral_id, slot).ok()
}
