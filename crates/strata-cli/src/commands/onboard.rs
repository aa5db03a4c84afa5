//! `strata onboard`: create and apply one tenant's application stack.

use anyhow::{Context, Result};
use clap::Args;
use std::process::ExitCode;
use strata_adapter_pulumi::PulumiCliEngine;
use strata_core::{Layer, StackRef};
use strata_policy::resolve_tenant_app_config;
use strata_runtime::{ProvisionOptions, StackEngine, TenantProvisioner};

use super::{print_json, success};
use crate::settings::{RunSettings, check_admin_password};

/// Tenant sizing overrides; unset values take the environment defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct TenantArgs {
    /// shared or isolated
    #[arg(long)]
    pub database_isolation: Option<String>,

    #[arg(long)]
    pub database_sku: Option<String>,

    /// standard or premium
    #[arg(long)]
    pub key_vault_sku: Option<String>,

    #[arg(long)]
    pub enable_private_endpoints: Option<bool>,

    #[arg(long)]
    pub enable_workload_identity: Option<bool>,

    /// Update an existing tenant stack instead of refusing.
    #[arg(long)]
    pub reuse_existing: bool,
}

pub async fn run(settings: &RunSettings, tenant_args: &TenantArgs, admin_password: &str) -> Result<ExitCode> {
    let mut request = settings.tenant_request();
    request.database_isolation = tenant_args.database_isolation.clone();
    request.database_sku = tenant_args.database_sku.clone();
    request.key_vault_sku = tenant_args.key_vault_sku.clone();
    request.enable_private_endpoints = tenant_args.enable_private_endpoints;
    request.enable_workload_identity = tenant_args.enable_workload_identity;

    let tenant = resolve_tenant_app_config(&request)?;
    check_admin_password(&tenant.target, admin_password)?;

    let engine = PulumiCliEngine::new(&settings.config.pulumi, settings.config.programs.clone());
    let platform_stack = StackRef::shared(Layer::Platform, &tenant.target, &tenant.location);
    let platform = engine
        .outputs(&platform_stack)
        .await
        .with_context(|| format!("reading outputs of {platform_stack}; has the platform layer been deployed?"))?;

    let provisioner = TenantProvisioner::new(
        engine,
        ProvisionOptions {
            admin_password: admin_password.to_string(),
            reuse_existing: tenant_args.reuse_existing,
        },
    );
    let report = provisioner.provision(&tenant, &platform).await?;

    if settings.json {
        print_json(&report)?;
    } else {
        println!("✔ {}", report.summary());
    }
    Ok(success())
}
