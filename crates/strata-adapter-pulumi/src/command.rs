//! `pulumi` command construction.
//!
//! Every command runs non-interactively against one stack, inside the program
//! directory of the stack's layer. Configuration values are passed on stdin so
//! secrets never appear in the process table.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use tokio::process::Command;

pub const PASSPHRASE_VAR: &str = "PULUMI_CONFIG_PASSPHRASE";
pub const BACKEND_VAR: &str = "PULUMI_BACKEND_URL";

/// Settings shared by every command.
#[derive(Clone, Default)]
pub struct CommandEnv {
    pub binary: String,
    pub backend_url: Option<String>,
    pub passphrase: Option<String>,
}

impl fmt::Debug for CommandEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEnv")
            .field("binary", &self.binary)
            .field("backend_url", &self.backend_url)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Operation against a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<'a> {
    SelectOrCreate,
    Init,
    ConfigSet { key: &'a str, secret: bool },
    Preview,
    Up,
    Output,
}

impl Operation<'_> {
    /// "already exists" from this command means the stack name is taken.
    pub fn creates_stack(&self) -> bool {
        matches!(self, Operation::Init)
    }

    /// "no stack named" from this command means the stack itself is missing.
    /// Preview and apply failures are never reclassified.
    pub fn addresses_stack(&self) -> bool {
        matches!(self, Operation::ConfigSet { .. } | Operation::Output)
    }

    fn args(&self) -> Vec<&str> {
        match self {
            Operation::SelectOrCreate => vec!["stack", "select", "--create"],
            Operation::Init => vec!["stack", "init"],
            Operation::ConfigSet { key, secret: false } => vec!["config", "set", *key],
            Operation::ConfigSet { key, secret: true } => vec!["config", "set", *key, "--secret"],
            Operation::Preview => vec!["preview", "--json"],
            Operation::Up => vec!["up", "--yes", "--skip-preview", "--json"],
            Operation::Output => vec!["stack", "output", "--json", "--show-secrets"],
        }
    }
}

/// A `pulumi` invocation whose `Debug` output never shows the passphrase.
pub struct PulumiCommand {
    inner: Command,
    label: String,
}

impl PulumiCommand {
    pub fn new(env: &CommandEnv, operation: Operation<'_>, stack: &str, cwd: &Path) -> Self {
        let mut cmd = Command::new(&env.binary);
        let op_args = operation.args();
        cmd.args(&op_args)
            .arg("--non-interactive")
            .arg("--stack")
            .arg(stack)
            .arg("--cwd")
            .arg(cwd);

        cmd.env("PULUMI_SKIP_UPDATE_CHECKS", "true");
        cmd.env("NO_COLOR", "1");
        if let Some(url) = &env.backend_url {
            cmd.env(BACKEND_VAR, url);
        }
        if let Some(passphrase) = &env.passphrase {
            cmd.env(PASSPHRASE_VAR, passphrase);
        }
        cmd.kill_on_drop(true);

        Self {
            inner: cmd,
            label: format!("pulumi {} --stack {stack}", op_args.join(" ")),
        }
    }

    /// Short description for logs and errors.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Deref for PulumiCommand {
    type Target = Command;

    fn deref(&self) -> &Command {
        &self.inner
    }
}

impl DerefMut for PulumiCommand {
    fn deref_mut(&mut self) -> &mut Command {
        &mut self.inner
    }
}

impl fmt::Debug for PulumiCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PulumiCommand")
            .field("command", &self.label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::ffi::OsStr;

    fn env() -> CommandEnv {
        CommandEnv {
            binary: "pulumi".to_string(),
            backend_url: Some("azblob://state".to_string()),
            passphrase: Some("p4ss".to_string()),
        }
    }

    fn args(cmd: &PulumiCommand) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn env_value<'a>(cmd: &'a PulumiCommand, key: &str) -> Option<&'a OsStr> {
        cmd.as_std()
            .get_envs()
            .find(|(k, _)| *k == OsStr::new(key))
            .and_then(|(_, v)| v)
    }

    #[test]
    fn test_select_or_create_args() {
        let cmd = PulumiCommand::new(
            &env(),
            Operation::SelectOrCreate,
            "platform-dev-eastus",
            Path::new("infra/platform"),
        );
        assert_eq!(
            args(&cmd),
            vec![
                "stack",
                "select",
                "--create",
                "--non-interactive",
                "--stack",
                "platform-dev-eastus",
                "--cwd",
                "infra/platform"
            ]
        );
    }

    #[test]
    fn test_secret_config_value_not_in_args() {
        let cmd = PulumiCommand::new(
            &env(),
            Operation::ConfigSet {
                key: "database:administratorPassword",
                secret: true,
            },
            "app-acme-dev-eastus",
            Path::new("infra/apps"),
        );
        let args = args(&cmd);
        assert_eq!(&args[..4], &["config", "set", "database:administratorPassword", "--secret"]);
        assert!(!format!("{cmd:?}").contains("p4ss"));
    }

    #[test]
    fn test_only_stack_commands_classify_errors() {
        assert!(Operation::Init.creates_stack());
        assert!(!Operation::Up.creates_stack());
        assert!(!Operation::Preview.creates_stack());

        assert!(Operation::Output.addresses_stack());
        assert!(Operation::ConfigSet { key: "k", secret: false }.addresses_stack());
        assert!(!Operation::Up.addresses_stack());
        assert!(!Operation::Preview.addresses_stack());
    }

    #[test]
    fn test_environment_variables() {
        let cmd = PulumiCommand::new(&env(), Operation::Up, "s", Path::new("."));
        assert_eq!(env_value(&cmd, "PULUMI_SKIP_UPDATE_CHECKS"), Some(OsStr::new("true")));
        assert_eq!(env_value(&cmd, "NO_COLOR"), Some(OsStr::new("1")));
        assert_eq!(env_value(&cmd, BACKEND_VAR), Some(OsStr::new("azblob://state")));
        assert_eq!(env_value(&cmd, PASSPHRASE_VAR), Some(OsStr::new("p4ss")));
        assert_eq!(cmd.label(), "pulumi up --yes --skip-preview --json --stack s");
    }

    #[test]
    fn test_optional_variables_unset() {
        let env = CommandEnv {
            binary: "pulumi".to_string(),
            ..Default::default()
        };
        let cmd = PulumiCommand::new(&env, Operation::Output, "s", Path::new("."));
        assert_eq!(env_value(&cmd, BACKEND_VAR), None);
        assert_eq!(env_value(&cmd, PASSPHRASE_VAR), None);
    }
}
