//! Tenant configuration validation.
//!
//! Same environment rules as deployment contexts, plus the tenant-specific
//! fields. Unset sizing fields take their environment defaults
//! ([`TenantDefaults::for_target`]).

use strata_core::{
    DatabaseIsolation, KeyVaultSku, TenantAppConfig, TenantDefaults, TenantRequest,
    database_tier_for_sku,
};

use crate::error::{ConfigurationError, ValidationReport};
use crate::rules::{check_environment, check_tenant_id, present, require};

/// Validate a tenant request without failing fast.
pub fn validate_tenant_app_config(request: &TenantRequest) -> ValidationReport {
    collect(request).0
}

/// Validate a tenant request and build the typed configuration.
pub fn resolve_tenant_app_config(
    request: &TenantRequest,
) -> Result<TenantAppConfig, ConfigurationError> {
    let (report, parsed) = collect(request);
    report.into_result()?;

    let parsed =
        parsed.ok_or_else(|| ConfigurationError::single("environment could not be resolved"))?;
    let defaults = TenantDefaults::for_target(&parsed.target);
    let (database_sku, database_tier) = match parsed.database_sku {
        Some((sku, tier)) => (sku, tier.to_string()),
        None => (defaults.database_sku, defaults.database_tier),
    };

    Ok(TenantAppConfig {
        tenant_id: request.tenant_id.trim().to_string(),
        location: request.location.trim().to_string(),
        database_isolation: parsed.isolation,
        database_sku,
        database_tier,
        redundancy_level: defaults.redundancy_level,
        key_vault_sku: parsed.key_vault_sku.unwrap_or(defaults.key_vault_sku),
        enable_private_endpoints: request
            .enable_private_endpoints
            .unwrap_or(defaults.enable_private_endpoints),
        enable_workload_identity: request
            .enable_workload_identity
            .unwrap_or(defaults.enable_workload_identity),
        target: parsed.target,
    })
}

struct Parsed {
    target: strata_core::ResolvedEnvironment,
    isolation: DatabaseIsolation,
    /// SKU override with the tier it implies.
    database_sku: Option<(String, &'static str)>,
    key_vault_sku: Option<KeyVaultSku>,
}

fn collect(request: &TenantRequest) -> (ValidationReport, Option<Parsed>) {
    let mut report = ValidationReport::new();

    let tenant_id = request.tenant_id.trim();
    require(&mut report, "tenantId", tenant_id);
    if !tenant_id.is_empty() {
        check_tenant_id(&mut report, tenant_id);
    }

    let target = check_environment(
        &mut report,
        &request.environment,
        request.ephemeral_id.as_deref(),
        request.deployment_slot.as_deref(),
    );
    require(&mut report, "location", &request.location);

    let isolation = match present(request.database_isolation.as_deref()) {
        None => Some(DatabaseIsolation::default()),
        Some(raw) => match raw.parse::<DatabaseIsolation>() {
            Ok(isolation) => Some(isolation),
            Err(_) => {
                report.push(format!(
                    "databaseIsolation '{raw}' must be one of shared, isolated"
                ));
                None
            }
        },
    };

    let database_sku = present(request.database_sku.as_deref()).and_then(|raw| {
        match database_tier_for_sku(raw) {
            Some(tier) => Some((raw.to_string(), tier)),
            None => {
                report.push(format!("databaseSku '{raw}' must start with B_, GP_ or MO_"));
                None
            }
        }
    });

    let key_vault_sku = match present(request.key_vault_sku.as_deref()) {
        None => Ok(None),
        Some(raw) => raw.parse::<KeyVaultSku>().map(Some).map_err(|_| raw),
    };
    let key_vault_sku = match key_vault_sku {
        Ok(sku) => sku,
        Err(raw) => {
            report.push(format!("keyVaultSku '{raw}' must be one of standard, premium"));
            None
        }
    };

    let parsed = match (target, isolation) {
        (Some(target), Some(isolation)) if report.is_valid() => Some(Parsed {
            target,
            isolation,
            database_sku,
            key_vault_sku,
        }),
        _ => None,
    };

    (report, parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_minimal_request_is_valid() {
        let report = validate_tenant_app_config(&TenantRequest::new("acme", "dev", "eastus"));
        assert!(report.is_valid());
    }

    #[test]
    fn test_required_fields_accumulate() {
        let report = validate_tenant_app_config(&TenantRequest::new("", "", ""));
        assert_eq!(
            report.errors,
            vec![
                "tenantId is required".to_string(),
                "environment is required".to_string(),
                "location is required".to_string(),
            ]
        );
    }

    #[test]
    fn test_unknown_isolation_rejected() {
        let mut req = TenantRequest::new("acme", "dev", "eastus");
        req.database_isolation = Some("dedicated".to_string());
        let report = validate_tenant_app_config(&req);
        assert_eq!(report.errors().len(), 1);
        assert!(report.errors()[0].contains("databaseIsolation"));
    }

    #[test]
    fn test_unknown_key_vault_sku_rejected() {
        let mut req = TenantRequest::new("acme", "dev", "eastus");
        req.key_vault_sku = Some("gold".to_string());
        let report = validate_tenant_app_config(&req);
        assert_eq!(report.errors().len(), 1);
        assert!(report.errors()[0].contains("keyVaultSku"));
    }

    #[test]
    fn test_two_violations_two_errors() {
        let mut req = TenantRequest::new("acme", "pr", "eastus");
        req.database_isolation = Some("dedicated".to_string());
        let report = validate_tenant_app_config(&req);
        assert_eq!(report.errors().len(), 2);
    }

    #[test]
    fn test_production_tenant_gets_larger_defaults() {
        let config = resolve_tenant_app_config(&TenantRequest::new("acme", "prod", "eastus")).unwrap();
        assert_eq!(config.database_sku, "GP_Standard_D4s_v3");
        assert_eq!(config.database_tier, "GeneralPurpose");
        assert_eq!(config.key_vault_sku, KeyVaultSku::Premium);
        assert_eq!(config.stack_ref().name(), "app-acme-prod-eastus");
    }

    #[test]
    fn test_nonproduction_tenant_defaults_and_overrides() {
        let mut req = TenantRequest::new("acme", "staging", "westeurope");
        req.database_isolation = Some("isolated".to_string());
        req.key_vault_sku = Some("premium".to_string());
        req.enable_private_endpoints = Some(true);

        let config = resolve_tenant_app_config(&req).unwrap();
        assert_eq!(config.database_sku, "B_Standard_B1ms");
        assert_eq!(config.database_isolation, DatabaseIsolation::Isolated);
        assert_eq!(config.key_vault_sku, KeyVaultSku::Premium);
        assert!(config.enable_private_endpoints);
    }

    #[test]
    fn test_database_sku_override_sets_matching_tier() {
        let mut req = TenantRequest::new("acme", "prod", "eastus");
        req.database_sku = Some("B_Standard_B1ms".to_string());
        let config = resolve_tenant_app_config(&req).unwrap();
        assert_eq!(config.database_sku, "B_Standard_B1ms");
        assert_eq!(config.database_tier, "Burstable");

        req.database_sku = Some("MO_Standard_E4ds_v5".to_string());
        let config = resolve_tenant_app_config(&req).unwrap();
        assert_eq!(config.database_tier, "MemoryOptimized");
    }

    #[test]
    fn test_unknown_database_sku_family_rejected() {
        let mut req = TenantRequest::new("acme", "dev", "eastus");
        req.database_sku = Some("Standard_D4".to_string());
        let report = validate_tenant_app_config(&req);
        assert_eq!(
            report.errors,
            vec!["databaseSku 'Standard_D4' must start with B_, GP_ or MO_".to_string()]
        );
    }

    #[test]
    fn test_ephemeral_tenant_stack_name() {
        let mut req = TenantRequest::new("acme", "pr", "eastus");
        req.ephemeral_id = Some("123".to_string());
        let config = resolve_tenant_app_config(&req).unwrap();
        assert_eq!(config.stack_ref().name(), "app-acme-pr-123-eastus");
    }
}
