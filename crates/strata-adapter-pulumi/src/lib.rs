//! [`StackEngine`] backed by the `pulumi` command-line tool.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use strata_core::{ChangeSummary, ConfigValue, ProgramsConfig, PulumiConfig, StackOutputs, StackRef};
use strata_runtime::{EngineError, StackEngine};
use tokio::io::AsyncWriteExt;

pub mod command;
pub mod parse;

use command::{CommandEnv, Operation, PulumiCommand};

pub struct PulumiCliEngine {
    env: CommandEnv,
    programs: ProgramsConfig,
}

impl PulumiCliEngine {
    /// Build from run configuration. The passphrase, when configured, is read
    /// from the named environment variable now.
    pub fn new(config: &PulumiConfig, programs: ProgramsConfig) -> Self {
        let passphrase = config
            .passphrase_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok());
        Self {
            env: CommandEnv {
                binary: config.binary.clone(),
                backend_url: config.backend_url.clone(),
                passphrase,
            },
            programs,
        }
    }

    fn program_dir(&self, stack: &StackRef) -> PathBuf {
        self.programs.dir_for(stack.layer()).to_path_buf()
    }

    /// Run one operation to completion, feeding `stdin` when given.
    /// Non-zero exits become engine errors.
    async fn run(
        &self,
        operation: Operation<'_>,
        stack: &StackRef,
        stdin: Option<&str>,
    ) -> Result<String, EngineError> {
        let mut cmd = PulumiCommand::new(&self.env, operation, stack.name(), &self.program_dir(stack));
        tracing::debug!(command = %cmd.label(), "Running pulumi");

        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = cmd.spawn()?;
        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes()).await?;
            pipe.shutdown().await?;
        }
        let output = child.wait_with_output().await?;
        check(operation, &cmd, stack, output)
    }
}

fn check(
    operation: Operation<'_>,
    cmd: &PulumiCommand,
    stack: &StackRef,
    output: Output,
) -> Result<String, EngineError> {
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    tracing::warn!(command = %cmd.label(), status = %output.status, %stderr, "pulumi failed");

    if operation.creates_stack() && parse::is_already_exists(&stderr) {
        return Err(EngineError::AlreadyExists {
            stack: stack.name().to_string(),
        });
    }
    if operation.addresses_stack() && parse::is_not_found(&stderr) {
        return Err(EngineError::NotFound {
            stack: stack.name().to_string(),
        });
    }
    Err(EngineError::CommandFailed {
        command: cmd.label().to_string(),
        status: output.status.to_string(),
        stderr,
    })
}

#[async_trait]
impl StackEngine for PulumiCliEngine {
    async fn select_or_create_stack(&self, stack: &StackRef) -> Result<(), EngineError> {
        self.run(Operation::SelectOrCreate, stack, None).await?;
        Ok(())
    }

    async fn create_stack(&self, stack: &StackRef) -> Result<(), EngineError> {
        self.run(Operation::Init, stack, None).await?;
        Ok(())
    }

    async fn set_config(
        &self,
        stack: &StackRef,
        key: &str,
        value: &ConfigValue,
    ) -> Result<(), EngineError> {
        let operation = Operation::ConfigSet {
            key,
            secret: value.secret,
        };
        self.run(operation, stack, Some(value.value.as_str())).await?;
        Ok(())
    }

    async fn preview(&self, stack: &StackRef) -> Result<ChangeSummary, EngineError> {
        let stdout = self.run(Operation::Preview, stack, None).await?;
        parse::parse_preview(&stdout)
    }

    async fn up(&self, stack: &StackRef) -> Result<StackOutputs, EngineError> {
        self.run(Operation::Up, stack, None).await?;
        self.outputs(stack)
            .await
            .map_err(|source| EngineError::OutputsUnavailable {
                stack: stack.name().to_string(),
                source: Box::new(source),
            })
    }

    async fn outputs(&self, stack: &StackRef) -> Result<StackOutputs, EngineError> {
        let stdout = self.run(Operation::Output, stack, None).await?;
        parse::parse_outputs(&stdout)
    }
}
