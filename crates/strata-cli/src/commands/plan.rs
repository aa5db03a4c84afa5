//! `strata plan`: show every stack and configuration value a deploy would
//! write, without calling the engine.

use anyhow::Result;
use std::process::ExitCode;
use strata_policy::resolve_deployment_context;
use strata_runtime::{PipelineSettings, plan_pipeline};

use super::{print_json, success};
use crate::settings::RunSettings;

pub fn run(settings: &RunSettings, admin_password: &str) -> Result<ExitCode> {
    let ctx = resolve_deployment_context(&settings.request)?;
    let pipeline = PipelineSettings {
        services: settings.config.services.clone(),
        admin_password: admin_password.to_string(),
    };
    let plan = plan_pipeline(&ctx, &pipeline);

    if settings.json {
        print_json(&plan)?;
        return Ok(success());
    }

    println!("Plan for {}", plan.environment);
    for layer in &plan.layers {
        println!();
        println!("{} → {}", layer.layer, layer.stack);
        for (key, value) in &layer.config {
            println!("  {key} = {value}");
        }
        for (from, key) in &layer.upstream {
            println!("  {key} ← {from}");
        }
    }
    for layer in &plan.skipped {
        println!();
        println!("{layer} skipped (no tenant)");
    }
    Ok(success())
}
