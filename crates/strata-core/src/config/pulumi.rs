//! Pulumi CLI configuration.

use serde::{Deserialize, Serialize};

/// Settings for the Pulumi stack engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulumiConfig {
    /// Path or name of the `pulumi` executable.
    #[serde(default = "default_binary")]
    pub binary: String,

    /// State backend URL passed as `PULUMI_BACKEND_URL` (e.g. `azblob://state`).
    /// When unset the CLI's own login is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,

    /// Environment variable holding the secrets passphrase.
    /// The value is forwarded as `PULUMI_CONFIG_PASSPHRASE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase_env: Option<String>,
}

impl Default for PulumiConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            backend_url: None,
            passphrase_env: None,
        }
    }
}

fn default_binary() -> String {
    "pulumi".to_string()
}
