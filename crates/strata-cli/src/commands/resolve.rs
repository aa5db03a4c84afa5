//! `strata resolve`: show the environment identity derived from a request.

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::process::ExitCode;
use strata_core::{ClusterTier, DeploymentContext, Layer, ProtectionPolicy};
use strata_policy::resolve_deployment_context;

use super::{print_json, success};
use crate::settings::RunSettings;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Resolution {
    effective_name: String,
    namespace: String,
    cluster_tier: ClusterTier,
    production_class: bool,
    protection: ProtectionPolicy,
    stacks: BTreeMap<Layer, String>,
}

impl Resolution {
    fn of(ctx: &DeploymentContext) -> Self {
        Self {
            effective_name: ctx.effective_name(),
            namespace: ctx.namespace(),
            cluster_tier: ctx.cluster_tier(),
            production_class: ctx.is_production_class(),
            protection: ctx.target.protection_policy(),
            stacks: Layer::ORDER
                .iter()
                .filter_map(|&layer| ctx.stack_ref(layer).map(|s| (layer, s.name().to_string())))
                .collect(),
        }
    }
}

pub fn run(settings: &RunSettings) -> Result<ExitCode> {
    let ctx = resolve_deployment_context(&settings.request)?;
    let resolution = Resolution::of(&ctx);

    if settings.json {
        print_json(&resolution)?;
        return Ok(success());
    }

    println!("Environment:      {}", resolution.effective_name);
    println!("Namespace:        {}", resolution.namespace);
    println!("Cluster tier:     {}", resolution.cluster_tier);
    println!("Production class: {}", resolution.production_class);
    println!(
        "Protection:       purge={}, soft-delete={}d, backups={}d",
        resolution.protection.purge_protection,
        resolution.protection.soft_delete_retention_days,
        resolution.protection.backup_retention_days
    );
    println!("Stacks:");
    for (layer, stack) in &resolution.stacks {
        println!("  {:<12} {stack}", layer.as_str());
    }
    Ok(success())
}
