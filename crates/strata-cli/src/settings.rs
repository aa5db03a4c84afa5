//! Run settings assembled from the configuration file, command-line flags and
//! environment variables.

use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;
use strata_core::{DeploymentRequest, ResolvedEnvironment, StrataConfig, TenantRequest};
use strata_policy::ConfigurationError;

pub const DEFAULT_ADMIN_PASSWORD: &str = "changeme";

/// Configuration file read when `--config`/`STRATA_CONFIG` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "strata.yaml";

/// Deployment target. Flags override environment variables; org, project and
/// location fall back to the configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    #[arg(long, env = "STRATA_ORG")]
    pub org: Option<String>,

    #[arg(long, env = "STRATA_PROJECT")]
    pub project: Option<String>,

    /// dev, test, staging, prod or pr
    #[arg(long, short = 'e', env = "DEPLOY_ENVIRONMENT")]
    pub environment: Option<String>,

    #[arg(long, short = 'l', env = "DEPLOY_LOCATION")]
    pub location: Option<String>,

    #[arg(long = "tenant", env = "TENANT_ID")]
    pub tenant_id: Option<String>,

    /// Required when the environment is `pr`
    #[arg(long, env = "EPHEMERAL_ID")]
    pub ephemeral_id: Option<String>,

    /// blue or green; prod only
    #[arg(long = "slot", env = "DEPLOYMENT_SLOT")]
    pub deployment_slot: Option<String>,
}

/// Database administrator password for tenant stacks.
#[derive(Args, Debug, Clone)]
pub struct SecretArgs {
    #[arg(
        long = "db-admin-password",
        env = "DB_ADMIN_PASSWORD",
        default_value = DEFAULT_ADMIN_PASSWORD,
        hide_env_values = true,
        hide_default_value = true
    )]
    pub admin_password: String,
}

/// Everything a command needs, resolved once.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub config: StrataConfig,
    pub request: DeploymentRequest,
    pub json: bool,
}

impl RunSettings {
    /// An explicitly named configuration file must exist; the implicit
    /// `strata.yaml` is optional.
    pub fn load(config_path: Option<&Path>, target: &TargetArgs, json: bool) -> Result<Self> {
        let (config_path, config) = match config_path {
            Some(path) => (path, StrataConfig::load_with_context(path)),
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                (path, StrataConfig::load_or_default(path))
            }
        };
        let config = config.with_context(|| format!("loading {}", config_path.display()))?;
        let request = build_request(&config, target);
        tracing::debug!(
            config = %config_path.display(),
            environment = %request.environment,
            location = %request.location,
            "Settings loaded"
        );
        Ok(Self {
            config,
            request,
            json,
        })
    }

    /// Tenant request for the same target.
    pub fn tenant_request(&self) -> TenantRequest {
        TenantRequest {
            tenant_id: self.request.tenant_id.clone().unwrap_or_default(),
            environment: self.request.environment.clone(),
            location: self.request.location.clone(),
            ephemeral_id: self.request.ephemeral_id.clone(),
            deployment_slot: self.request.deployment_slot.clone(),
            ..Default::default()
        }
    }
}

fn build_request(config: &StrataConfig, target: &TargetArgs) -> DeploymentRequest {
    let pick = |arg: &Option<String>, file: &Option<String>| {
        arg.clone().or_else(|| file.clone()).unwrap_or_default()
    };
    DeploymentRequest {
        org: pick(&target.org, &config.org),
        project: pick(&target.project, &config.project),
        environment: target.environment.clone().unwrap_or_default(),
        location: pick(&target.location, &config.location),
        tenant_id: target.tenant_id.clone(),
        ephemeral_id: target.ephemeral_id.clone(),
        deployment_slot: target.deployment_slot.clone(),
    }
}

/// The default password is only acceptable outside production-class targets.
pub fn check_admin_password(
    target: &ResolvedEnvironment,
    password: &str,
) -> Result<(), ConfigurationError> {
    if password.trim().is_empty() {
        return Err(ConfigurationError::single("DB_ADMIN_PASSWORD must not be empty"));
    }
    if target.is_production_class() && password == DEFAULT_ADMIN_PASSWORD {
        return Err(ConfigurationError::single(format!(
            "DB_ADMIN_PASSWORD must be set for production-class environment '{target}'"
        )));
    }
    Ok(())
}
