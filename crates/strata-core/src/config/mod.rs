//! Run configuration for Strata.
//!
//! Configuration is loaded once per run from a YAML file (`strata.yaml` by
//! default) and overlaid by command-line arguments and environment variables
//! in the CLI. Nothing in the library crates reads process state directly.
//!
//! # Example
//!
//! ```yaml
//! org: contoso
//! project: landing-zone
//! location: eastus
//! programs:
//!   platform: infra/02-platform
//!   services: infra/03-services
//!   application: infra/04-apps
//! services:
//!   enableIngress: true
//!   enableCertManager: true
//!   enableMonitoring: false
//! pulumi:
//!   backend_url: azblob://state
//! ```

pub mod pulumi;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::stack::Layer;

pub use pulumi::PulumiConfig;

/// Complete Strata configuration loaded from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrataConfig {
    /// Organisation name; overridden by `STRATA_ORG`.
    #[serde(default)]
    pub org: Option<String>,

    /// Project name; overridden by `STRATA_PROJECT`.
    #[serde(default)]
    pub project: Option<String>,

    /// Default location; overridden by `DEPLOY_LOCATION`.
    #[serde(default)]
    pub location: Option<String>,

    /// Infrastructure program directory for each layer.
    #[serde(default)]
    pub programs: ProgramsConfig,

    /// Add-on toggles written to the services layer as `services:{name}`.
    #[serde(default)]
    pub services: BTreeMap<String, bool>,

    /// Pulumi CLI settings.
    #[serde(default)]
    pub pulumi: PulumiConfig,
}

/// Program directories per layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramsConfig {
    #[serde(default = "default_platform_dir")]
    pub platform: PathBuf,

    #[serde(default = "default_services_dir")]
    pub services: PathBuf,

    #[serde(default = "default_application_dir")]
    pub application: PathBuf,
}

impl Default for ProgramsConfig {
    fn default() -> Self {
        Self {
            platform: default_platform_dir(),
            services: default_services_dir(),
            application: default_application_dir(),
        }
    }
}

impl ProgramsConfig {
    pub fn dir_for(&self, layer: Layer) -> &Path {
        match layer {
            Layer::Platform => &self.platform,
            Layer::Services => &self.services,
            Layer::Application => &self.application,
        }
    }

    fn resolve_against(&mut self, base_dir: &Path) {
        for dir in [&mut self.platform, &mut self.services, &mut self.application] {
            if dir.is_relative() {
                *dir = base_dir.join(&*dir);
            }
        }
    }
}

fn default_platform_dir() -> PathBuf {
    PathBuf::from("infra/platform")
}

fn default_services_dir() -> PathBuf {
    PathBuf::from("infra/services")
}

fn default_application_dir() -> PathBuf {
    PathBuf::from("infra/apps")
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StrataConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.check_toggles()?;
        Ok(config)
    }

    /// Load configuration and resolve program directories relative to the
    /// configuration file.
    pub fn load_with_context(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_file(path)?;

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        config.programs.resolve_against(&base_dir);

        Ok(config)
    }

    /// Load the file when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_with_context(path)
        } else {
            Ok(Self::default())
        }
    }

    fn check_toggles(&self) -> Result<(), ConfigError> {
        if let Some(bad) = self
            .services
            .keys()
            .find(|name| name.is_empty() || name.contains(':'))
        {
            return Err(ConfigError::Config(format!(
                "invalid services toggle name '{bad}': must be non-empty and contain no ':'"
            )));
        }
        Ok(())
    }
}
