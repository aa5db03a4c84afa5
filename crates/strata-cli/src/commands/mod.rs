//! CLI command implementations for Strata.

pub mod deploy;
pub mod onboard;
pub mod plan;
pub mod resolve;
pub mod validate;

use anyhow::Result;
use serde::Serialize;
use std::process::ExitCode;
use strata_core::ConfigError;
use strata_policy::ConfigurationError;
use strata_runtime::{PipelineError, ProvisionError};

/// Process exit codes.
pub mod exit {
    pub const SUCCESS: u8 = 0;
    pub const FAILURE: u8 = 1;
    pub const INVALID_CONFIGURATION: u8 = 2;
    pub const TENANT_ALREADY_ONBOARDED: u8 = 3;
}

/// Exit code for an error that escaped a command.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if cause.is::<ConfigurationError>() || cause.is::<ConfigError>() {
            return exit::INVALID_CONFIGURATION;
        }
        if let Some(err) = cause.downcast_ref::<PipelineError>() {
            return match err {
                PipelineError::Configuration(_) => exit::INVALID_CONFIGURATION,
                _ => exit::FAILURE,
            };
        }
        if let Some(err) = cause.downcast_ref::<ProvisionError>() {
            return match err {
                ProvisionError::Configuration(_) => exit::INVALID_CONFIGURATION,
                ProvisionError::TenantAlreadyOnboarded { .. } => exit::TENANT_ALREADY_ONBOARDED,
                _ => exit::FAILURE,
            };
        }
    }
    exit::FAILURE
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn success() -> ExitCode {
    ExitCode::from(exit::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let config = anyhow::Error::new(ConfigurationError::single("org is required"));
        assert_eq!(exit_code_for(&config), exit::INVALID_CONFIGURATION);

        let onboarded = anyhow::Error::new(ProvisionError::TenantAlreadyOnboarded {
            tenant_id: "acme".to_string(),
            stack: "app-acme-dev-eastus".to_string(),
        });
        assert_eq!(exit_code_for(&onboarded), exit::TENANT_ALREADY_ONBOARDED);

        let wrapped = anyhow::Error::new(ProvisionError::DuplicateStack {
            stack: "s".to_string(),
        })
        .context("onboarding");
        assert_eq!(exit_code_for(&wrapped), exit::FAILURE);

        assert_eq!(exit_code_for(&anyhow::anyhow!("boom")), exit::FAILURE);
    }
}
