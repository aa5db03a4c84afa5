//! Deployment and tenant requests.
//!
//! `DeploymentRequest` and `TenantRequest` carry raw, string-typed input as it
//! arrives from the process environment or a file. Validation (in
//! `strata-policy`) turns them into the typed [`DeploymentContext`] and
//! [`TenantAppConfig`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::environment::{ClusterTier, ResolvedEnvironment};
use crate::stack::{Layer, StackRef};

/// Raw deployment intent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRequest {
    #[serde(default)]
    pub org: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ephemeral_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_slot: Option<String>,
}

impl DeploymentRequest {
    pub fn new(
        org: impl Into<String>,
        project: impl Into<String>,
        environment: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            org: org.into(),
            project: project.into(),
            environment: environment.into(),
            location: location.into(),
            ..Default::default()
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_ephemeral_id(mut self, ephemeral_id: impl Into<String>) -> Self {
        self.ephemeral_id = Some(ephemeral_id.into());
        self
    }

    pub fn with_slot(mut self, slot: impl Into<String>) -> Self {
        self.deployment_slot = Some(slot.into());
        self
    }
}

/// Validated deployment intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentContext {
    pub org: String,
    pub project: String,
    pub target: ResolvedEnvironment,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

impl DeploymentContext {
    pub fn effective_name(&self) -> String {
        self.target.effective_name()
    }

    pub fn namespace(&self) -> String {
        self.target.namespace()
    }

    pub fn cluster_tier(&self) -> ClusterTier {
        self.target.cluster_tier()
    }

    pub fn is_production_class(&self) -> bool {
        self.target.is_production_class()
    }

    /// Stack for a layer. `None` for the application layer without a tenant.
    pub fn stack_ref(&self, layer: Layer) -> Option<StackRef> {
        match layer {
            Layer::Platform | Layer::Services => {
                Some(StackRef::shared(layer, &self.target, &self.location))
            }
            Layer::Application => self
                .tenant_id
                .as_deref()
                .map(|tenant| StackRef::tenant(tenant, &self.target, &self.location)),
        }
    }
}

/// A string did not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseIsolation {
    #[default]
    Shared,
    Isolated,
}

impl DatabaseIsolation {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseIsolation::Shared => "shared",
            DatabaseIsolation::Isolated => "isolated",
        }
    }
}

impl fmt::Display for DatabaseIsolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseIsolation {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shared" => Ok(DatabaseIsolation::Shared),
            "isolated" => Ok(DatabaseIsolation::Isolated),
            other => Err(UnknownVariant {
                kind: "database isolation",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyVaultSku {
    Standard,
    Premium,
}

impl KeyVaultSku {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyVaultSku::Standard => "standard",
            KeyVaultSku::Premium => "premium",
        }
    }
}

impl fmt::Display for KeyVaultSku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyVaultSku {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(KeyVaultSku::Standard),
            "premium" => Ok(KeyVaultSku::Premium),
            other => Err(UnknownVariant {
                kind: "key vault sku",
                value: other.to_string(),
            }),
        }
    }
}

/// Sizing applied to a tenant when the request leaves it unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantDefaults {
    pub database_sku: String,
    pub database_tier: String,
    pub redundancy_level: String,
    pub key_vault_sku: KeyVaultSku,
    pub enable_private_endpoints: bool,
    pub enable_workload_identity: bool,
}

impl TenantDefaults {
    /// Production-class tenants get a larger database and a premium vault.
    pub fn for_target(target: &ResolvedEnvironment) -> Self {
        if target.is_production_class() {
            Self {
                database_sku: "GP_Standard_D4s_v3".to_string(),
                database_tier: "GeneralPurpose".to_string(),
                redundancy_level: "ZoneRedundant".to_string(),
                key_vault_sku: KeyVaultSku::Premium,
                enable_private_endpoints: true,
                enable_workload_identity: true,
            }
        } else {
            Self {
                database_sku: "B_Standard_B1ms".to_string(),
                database_tier: "Burstable".to_string(),
                redundancy_level: "Disabled".to_string(),
                key_vault_sku: KeyVaultSku::Standard,
                enable_private_endpoints: false,
                enable_workload_identity: true,
            }
        }
    }
}

/// Pricing tier implied by a database SKU name (`B_`, `GP_` or `MO_` prefix).
pub fn database_tier_for_sku(sku: &str) -> Option<&'static str> {
    [
        ("B_", "Burstable"),
        ("GP_", "GeneralPurpose"),
        ("MO_", "MemoryOptimized"),
    ]
    .into_iter()
    .find(|(prefix, _)| sku.starts_with(prefix))
    .map(|(_, tier)| tier)
}

/// Raw tenant onboarding input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantRequest {
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ephemeral_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_slot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_isolation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_vault_sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_private_endpoints: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_workload_identity: Option<bool>,
}

impl TenantRequest {
    pub fn new(
        tenant_id: impl Into<String>,
        environment: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            environment: environment.into(),
            location: location.into(),
            ..Default::default()
        }
    }
}

/// Validated per-tenant configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantAppConfig {
    pub tenant_id: String,
    pub target: ResolvedEnvironment,
    pub location: String,
    pub database_isolation: DatabaseIsolation,
    pub database_sku: String,
    pub database_tier: String,
    pub redundancy_level: String,
    pub key_vault_sku: KeyVaultSku,
    pub enable_private_endpoints: bool,
    pub enable_workload_identity: bool,
}

impl TenantAppConfig {
    /// Tenant configuration with every optional field at its environment default.
    pub fn with_defaults(
        tenant_id: impl Into<String>,
        target: ResolvedEnvironment,
        location: impl Into<String>,
    ) -> Self {
        let defaults = TenantDefaults::for_target(&target);
        Self {
            tenant_id: tenant_id.into(),
            target,
            location: location.into(),
            database_isolation: DatabaseIsolation::default(),
            database_sku: defaults.database_sku,
            database_tier: defaults.database_tier,
            redundancy_level: defaults.redundancy_level,
            key_vault_sku: defaults.key_vault_sku,
            enable_private_endpoints: defaults.enable_private_endpoints,
            enable_workload_identity: defaults.enable_workload_identity,
        }
    }

    /// Tenant configuration for the application layer of a pipeline run.
    /// `None` when the context names no tenant.
    pub fn from_context(ctx: &DeploymentContext) -> Option<Self> {
        ctx.tenant_id
            .as_deref()
            .map(|tenant| Self::with_defaults(tenant, ctx.target.clone(), ctx.location.clone()))
    }

    pub fn stack_ref(&self) -> StackRef {
        StackRef::tenant(&self.tenant_id, &self.target, &self.location)
    }

    pub fn effective_name(&self) -> String {
        self.target.effective_name()
    }
}
