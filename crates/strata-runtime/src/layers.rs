//! Layer descriptors and per-layer stack configuration.
//!
//! Each layer declares which outputs of earlier layers it consumes. Only
//! those keys are forwarded, under the `upstream:` prefix; everything else a
//! layer produces stays private to it.

use serde::Serialize;
use std::collections::BTreeMap;
use strata_core::keys::{database, infrastructure, keyvault, services};
use strata_core::{
    ConfigMap, DeploymentContext, Layer, ResolvedEnvironment, StackOutputs, TenantAppConfig,
};

/// One output consumed from an earlier layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpstreamBinding {
    pub from: Layer,
    pub key: &'static str,
}

const fn platform(key: &'static str) -> UpstreamBinding {
    UpstreamBinding {
        from: Layer::Platform,
        key,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayerDescriptor {
    pub layer: Layer,
    pub upstream: &'static [UpstreamBinding],
}

/// The pipeline, in apply order.
pub static PIPELINE: [LayerDescriptor; 3] = [
    LayerDescriptor {
        layer: Layer::Platform,
        upstream: &[],
    },
    LayerDescriptor {
        layer: Layer::Services,
        upstream: &[
            platform("resourceGroupName"),
            platform("vnetId"),
            platform("clusterId"),
            platform("clusterName"),
        ],
    },
    LayerDescriptor {
        layer: Layer::Application,
        upstream: &[
            platform("resourceGroupName"),
            platform("clusterName"),
            platform("databaseServerName"),
            platform("keyVaultUri"),
        ],
    },
];

pub fn descriptor(layer: Layer) -> &'static LayerDescriptor {
    match layer {
        Layer::Platform => &PIPELINE[0],
        Layer::Services => &PIPELINE[1],
        Layer::Application => &PIPELINE[2],
    }
}

/// A declared upstream output was not produced by its source layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{from} output '{key}' is missing")]
pub struct MissingUpstream {
    pub from: Layer,
    pub key: String,
}

/// Project the declared upstream outputs into `upstream:` config entries.
pub fn project_upstream(
    descriptor: &LayerDescriptor,
    outputs: &BTreeMap<Layer, StackOutputs>,
) -> Result<ConfigMap, MissingUpstream> {
    let mut config = ConfigMap::new();
    for binding in descriptor.upstream {
        let value = outputs
            .get(&binding.from)
            .and_then(|o| o.get(binding.key))
            .ok_or_else(|| MissingUpstream {
                from: binding.from,
                key: binding.key.to_string(),
            })?;
        config.insert_upstream(binding.key, value);
    }
    Ok(config)
}

/// Settings every stack of a target shares.
fn target_config(target: &ResolvedEnvironment, location: &str) -> ConfigMap {
    let protection = target.protection_policy();

    let mut config = ConfigMap::new();
    config.insert(infrastructure::ENVIRONMENT, target.effective_name());
    config.insert(infrastructure::LOCATION, location);
    config.insert(infrastructure::CLUSTER_TYPE, target.cluster_tier().as_str());
    config.insert(infrastructure::NAMESPACE, target.namespace());
    config.insert(infrastructure::PURGE_PROTECTION, protection.purge_protection);
    config.insert(
        infrastructure::SOFT_DELETE_RETENTION_DAYS,
        protection.soft_delete_retention_days,
    );
    config.insert(
        infrastructure::BACKUP_RETENTION_DAYS,
        protection.backup_retention_days,
    );
    config
}

/// Platform layer configuration.
pub fn infrastructure_config(ctx: &DeploymentContext) -> ConfigMap {
    let mut config = target_config(&ctx.target, &ctx.location);
    config.insert(infrastructure::ORG, ctx.org.as_str());
    config.insert(infrastructure::PROJECT, ctx.project.as_str());
    config
}

/// Services layer configuration: infrastructure keys plus add-on toggles.
pub fn services_config(ctx: &DeploymentContext, toggles: &BTreeMap<String, bool>) -> ConfigMap {
    let mut config = infrastructure_config(ctx);
    for (name, enabled) in toggles {
        config.insert(services::toggle(name), *enabled);
    }
    config
}

/// Full configuration of a tenant application stack.
pub fn tenant_config_map(tenant: &TenantAppConfig, admin_password: &str) -> ConfigMap {
    let mut config = target_config(&tenant.target, &tenant.location);
    config.insert(infrastructure::TENANT_ID, tenant.tenant_id.as_str());

    config.insert(database::ISOLATION, tenant.database_isolation.as_str());
    config.insert(database::SKU_NAME, tenant.database_sku.as_str());
    config.insert(database::SKU_TIER, tenant.database_tier.as_str());
    config.insert(database::REDUNDANCY_LEVEL, tenant.redundancy_level.as_str());
    config.insert_secret(database::ADMINISTRATOR_PASSWORD, admin_password);

    config.insert(keyvault::SKU, tenant.key_vault_sku.as_str());

    config.insert(
        services::ENABLE_PRIVATE_ENDPOINTS,
        tenant.enable_private_endpoints,
    );
    config.insert(
        services::ENABLE_WORKLOAD_IDENTITY,
        tenant.enable_workload_identity,
    );
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use strata_core::{BaseEnvironment, DeploymentSlot};

    fn context(target: ResolvedEnvironment) -> DeploymentContext {
        DeploymentContext {
            org: "contoso".to_string(),
            project: "lz".to_string(),
            target,
            location: "eastus".to_string(),
            tenant_id: None,
        }
    }

    #[test]
    fn test_pipeline_order_and_descriptors() {
        let layers: Vec<Layer> = PIPELINE.iter().map(|d| d.layer).collect();
        assert_eq!(layers, Layer::ORDER.to_vec());
        assert!(descriptor(Layer::Platform).upstream.is_empty());
        assert_eq!(descriptor(Layer::Services).upstream.len(), 4);
        assert!(
            descriptor(Layer::Application)
                .upstream
                .iter()
                .all(|b| b.from == Layer::Platform)
        );
    }

    #[test]
    fn test_platform_config_for_production_slot() {
        let config = infrastructure_config(&context(ResolvedEnvironment::prod_slot(
            DeploymentSlot::Blue,
        )));
        assert_eq!(config.value(infrastructure::ENVIRONMENT), Some("prod-blue"));
        assert_eq!(config.value(infrastructure::CLUSTER_TYPE), Some("prod"));
        assert_eq!(config.value(infrastructure::PURGE_PROTECTION), Some("true"));
        assert_eq!(
            config.value(infrastructure::SOFT_DELETE_RETENTION_DAYS),
            Some("90")
        );
        assert_eq!(config.value(infrastructure::ORG), Some("contoso"));
        assert!(!config.contains_key(infrastructure::TENANT_ID));
    }

    #[test]
    fn test_services_config_adds_toggles() {
        let toggles = BTreeMap::from([
            ("enableIngress".to_string(), true),
            ("enableMonitoring".to_string(), false),
        ]);
        let config = services_config(
            &context(ResolvedEnvironment::base(BaseEnvironment::Test)),
            &toggles,
        );
        assert_eq!(config.value("services:enableIngress"), Some("true"));
        assert_eq!(config.value("services:enableMonitoring"), Some("false"));
        assert_eq!(config.value(infrastructure::CLUSTER_TYPE), Some("nonprod"));
    }

    #[test]
    fn test_upstream_projection_only_forwards_declared_keys() {
        let outputs = BTreeMap::from([(
            Layer::Platform,
            StackOutputs::from_iter([
                ("resourceGroupName", json!("rg-dev")),
                ("vnetId", json!("/vnets/1")),
                ("clusterId", json!("/clusters/1")),
                ("clusterName", json!("aks-dev")),
                ("internalOnly", json!({"a": 1})),
            ]),
        )]);
        let config = project_upstream(descriptor(Layer::Services), &outputs).unwrap();
        assert_eq!(config.len(), 4);
        assert_eq!(config.value("upstream:clusterName"), Some("aks-dev"));
        assert!(!config.contains_key("upstream:internalOnly"));
    }

    #[test]
    fn test_missing_upstream_key() {
        let outputs = BTreeMap::from([(
            Layer::Platform,
            StackOutputs::from_iter([("resourceGroupName", json!("rg-dev"))]),
        )]);
        let err = project_upstream(descriptor(Layer::Services), &outputs).unwrap_err();
        assert_eq!(
            err,
            MissingUpstream {
                from: Layer::Platform,
                key: "vnetId".to_string(),
            }
        );
    }

    #[test]
    fn test_tenant_config_map_marks_password_secret() {
        let tenant = TenantAppConfig::with_defaults(
            "acme",
            ResolvedEnvironment::base(BaseEnvironment::Prod),
            "eastus",
        );
        let config = tenant_config_map(&tenant, "s3cret");
        assert_eq!(config.value(infrastructure::TENANT_ID), Some("acme"));
        assert_eq!(config.value(database::SKU_NAME), Some("GP_Standard_D4s_v3"));
        assert_eq!(config.value(keyvault::SKU), Some("premium"));
        let password = config.get(database::ADMINISTRATOR_PASSWORD).unwrap();
        assert!(password.secret);
        assert_eq!(password.value, "s3cret");
    }
}
