//! `strata deploy`: apply the platform, services and application layers.

use anyhow::Result;
use std::process::ExitCode;
use strata_adapter_pulumi::PulumiCliEngine;
use strata_policy::resolve_deployment_context;
use strata_runtime::{Orchestrator, PipelineError, PipelineReport, PipelineSettings};

use super::{exit, print_json, success};
use crate::settings::{RunSettings, check_admin_password};

pub async fn run(settings: &RunSettings, admin_password: &str) -> Result<ExitCode> {
    let ctx = resolve_deployment_context(&settings.request)?;
    if ctx.tenant_id.is_some() {
        check_admin_password(&ctx.target, admin_password)?;
    }

    let engine = PulumiCliEngine::new(&settings.config.pulumi, settings.config.programs.clone());
    let pipeline = PipelineSettings {
        services: settings.config.services.clone(),
        admin_password: admin_password.to_string(),
    };
    let orchestrator = Orchestrator::new(engine, pipeline);

    match orchestrator.run(&ctx).await {
        Ok(report) => {
            print_report(settings, &report)?;
            Ok(success())
        }
        Err(err @ PipelineError::Configuration(_)) => Err(err.into()),
        Err(err) => {
            print_failure(settings, &err)?;
            Ok(ExitCode::from(exit::FAILURE))
        }
    }
}

fn print_report(settings: &RunSettings, report: &PipelineReport) -> Result<()> {
    if settings.json {
        return print_json(report);
    }
    println!("✔ Deployed {} (run {})", report.environment, report.run_id);
    for layer in &report.layers {
        println!("  {:<12} {} ({})", layer.layer.as_str(), layer.stack, layer.changes);
    }
    for layer in &report.skipped {
        println!("  {:<12} skipped (no tenant)", layer.as_str());
    }
    Ok(())
}

fn print_failure(settings: &RunSettings, err: &PipelineError) -> Result<()> {
    if settings.json {
        return print_json(&serde_json::json!({
            "error": err.to_string(),
            "layer": err.layer(),
            "stage": err.stage(),
            "completed": err.completed(),
        }));
    }
    eprintln!("✖ {err}");
    if !err.completed().is_empty() {
        eprintln!("  Applied before the failure (left in place):");
        for layer in err.completed() {
            eprintln!("    {}", layer.stack);
        }
    }
    Ok(())
}
