use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use strata_core::{ChangeSummary, ConfigMap, ConfigValue, StackOutputs, StackRef};

/// Failure reported by a stack engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("stack '{stack}' already exists")]
    AlreadyExists { stack: String },

    #[error("stack '{stack}' not found")]
    NotFound { stack: String },

    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// `up` completed; the follow-up read of the stack's outputs did not.
    #[error("stack '{stack}' was applied, but reading its outputs failed: {source}")]
    OutputsUnavailable {
        stack: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error("invalid engine output: {0}")]
    InvalidOutput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Stage a failed [`StackEngine::up`] is reported under.
    pub fn apply_stage(&self) -> Stage {
        match self {
            EngineError::OutputsUnavailable { .. } => Stage::Outputs,
            _ => Stage::Apply,
        }
    }
}

/// Engine call being made when a layer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Select,
    Create,
    Configure,
    Preview,
    Apply,
    /// Reading outputs after a completed apply.
    Outputs,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Select => "select",
            Stage::Create => "create",
            Stage::Configure => "configure",
            Stage::Preview => "preview",
            Stage::Apply => "apply",
            Stage::Outputs => "outputs",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External infrastructure engine. Owns stack state, locking and resource
/// diffs; Strata only names stacks, writes their configuration and asks for
/// preview and apply.
#[async_trait]
pub trait StackEngine: Send + Sync {
    /// Select the stack, creating it when it does not exist yet.
    async fn select_or_create_stack(&self, stack: &StackRef) -> Result<(), EngineError>;

    /// Create a new stack. Fails with [`EngineError::AlreadyExists`] when the
    /// name is taken.
    async fn create_stack(&self, stack: &StackRef) -> Result<(), EngineError>;

    async fn set_config(
        &self,
        stack: &StackRef,
        key: &str,
        value: &ConfigValue,
    ) -> Result<(), EngineError>;

    /// Non-mutating dry run.
    async fn preview(&self, stack: &StackRef) -> Result<ChangeSummary, EngineError>;

    /// Apply the stack and return its full outputs.
    async fn up(&self, stack: &StackRef) -> Result<StackOutputs, EngineError>;

    /// Outputs of the last successful apply.
    async fn outputs(&self, stack: &StackRef) -> Result<StackOutputs, EngineError>;

    /// Write every entry of a configuration map, in key order.
    async fn set_config_map(&self, stack: &StackRef, config: &ConfigMap) -> Result<(), EngineError> {
        for (key, value) in config {
            self.set_config(stack, key, value).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<E: StackEngine + ?Sized> StackEngine for Arc<E> {
    async fn select_or_create_stack(&self, stack: &StackRef) -> Result<(), EngineError> {
        (**self).select_or_create_stack(stack).await
    }

    async fn create_stack(&self, stack: &StackRef) -> Result<(), EngineError> {
        (**self).create_stack(stack).await
    }

    async fn set_config(
        &self,
        stack: &StackRef,
        key: &str,
        value: &ConfigValue,
    ) -> Result<(), EngineError> {
        (**self).set_config(stack, key, value).await
    }

    async fn preview(&self, stack: &StackRef) -> Result<ChangeSummary, EngineError> {
        (**self).preview(stack).await
    }

    async fn up(&self, stack: &StackRef) -> Result<StackOutputs, EngineError> {
        (**self).up(stack).await
    }

    async fn outputs(&self, stack: &StackRef) -> Result<StackOutputs, EngineError> {
        (**self).outputs(stack).await
    }
}
