//! `strata validate`: check a deployment request without touching any stack.

use anyhow::Result;
use std::process::ExitCode;
use strata_policy::validate_deployment_context;

use super::{exit, print_json};
use crate::settings::RunSettings;

pub fn run(settings: &RunSettings) -> Result<ExitCode> {
    let report = validate_deployment_context(&settings.request);

    if settings.json {
        print_json(&report)?;
    } else if report.is_valid() {
        println!("✔ Deployment request is valid");
    } else {
        println!("✖ Deployment request is invalid:");
        for error in report.errors() {
            println!("  - {error}");
        }
    }

    Ok(ExitCode::from(if report.is_valid() {
        exit::SUCCESS
    } else {
        exit::INVALID_CONFIGURATION
    }))
}
