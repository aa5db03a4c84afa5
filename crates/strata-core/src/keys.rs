//! Stack configuration key namespaces.
//!
//! These strings are read by the infrastructure programs of each layer and
//! must stay stable across releases.

/// Prefix for values forwarded from an earlier layer's outputs.
pub const UPSTREAM_PREFIX: &str = "upstream:";

/// Key under which an upstream output is written.
pub fn upstream(output_key: &str) -> String {
    format!("{UPSTREAM_PREFIX}{output_key}")
}

pub mod infrastructure {
    pub const TENANT_ID: &str = "infrastructure:tenantId";
    pub const ENVIRONMENT: &str = "infrastructure:environment";
    pub const LOCATION: &str = "infrastructure:location";
    pub const CLUSTER_TYPE: &str = "infrastructure:clusterType";
    pub const ORG: &str = "infrastructure:org";
    pub const PROJECT: &str = "infrastructure:project";
    pub const NAMESPACE: &str = "infrastructure:namespace";
    pub const PURGE_PROTECTION: &str = "infrastructure:purgeProtection";
    pub const SOFT_DELETE_RETENTION_DAYS: &str = "infrastructure:softDeleteRetentionDays";
    pub const BACKUP_RETENTION_DAYS: &str = "infrastructure:backupRetentionDays";
}

pub mod database {
    pub const ISOLATION: &str = "database:isolation";
    pub const SKU_NAME: &str = "database:skuName";
    pub const SKU_TIER: &str = "database:skuTier";
    pub const REDUNDANCY_LEVEL: &str = "database:redundancyLevel";
    pub const ADMINISTRATOR_PASSWORD: &str = "database:administratorPassword";
}

pub mod keyvault {
    pub const SKU: &str = "keyvault:sku";
}

pub mod services {
    pub const PREFIX: &str = "services:";
    pub const ENABLE_PRIVATE_ENDPOINTS: &str = "services:enablePrivateEndpoints";
    pub const ENABLE_WORKLOAD_IDENTITY: &str = "services:enableWorkloadIdentity";

    /// Key for an add-on toggle named in the run configuration.
    pub fn toggle(name: &str) -> String {
        format!("{PREFIX}{name}")
    }
}
