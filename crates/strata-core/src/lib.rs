//! Core types shared across Strata crates.
//!
//! - [`environment`]: environment identity, slots, cluster tiers
//! - [`context`]: raw requests and validated deployment/tenant contexts
//! - [`stack`]: layers, stack identifiers, configuration maps, outputs
//! - [`keys`]: stack configuration key namespaces
//! - [`config`]: run configuration loaded from `strata.yaml`

pub mod config;
pub mod context;
pub mod environment;
pub mod keys;
pub mod stack;

pub use config::{ConfigError, ProgramsConfig, PulumiConfig, StrataConfig};
pub use context::{
    DatabaseIsolation, DeploymentContext, DeploymentRequest, KeyVaultSku, TenantAppConfig,
    TenantDefaults, TenantRequest, UnknownVariant, database_tier_for_sku,
};
pub use environment::{
    BaseEnvironment, ClusterTier, DeploymentSlot, Environment, EnvironmentError, EphemeralId,
    ProtectionPolicy, ResolvedEnvironment, cluster_tier, effective_environment_name,
    environment_namespace, is_production_class, is_production_class_name, protection_policy,
};
pub use stack::{ChangeSummary, ConfigMap, ConfigValue, Layer, StackOutputs, StackRef};
