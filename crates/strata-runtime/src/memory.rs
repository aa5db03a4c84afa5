//! In-process stack engine.
//!
//! Keeps stacks, their configuration and canned outputs in memory and records
//! every call. Lets a pipeline run end to end without touching infrastructure.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use strata_core::{ChangeSummary, ConfigMap, ConfigValue, Layer, StackOutputs, StackRef};

use crate::engine::{EngineError, StackEngine, Stage};

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    SelectOrCreate(String),
    Create(String),
    SetConfig {
        stack: String,
        key: String,
        value: ConfigValue,
    },
    Preview(String),
    Up(String),
}

impl EngineCall {
    pub fn stack(&self) -> &str {
        match self {
            EngineCall::SelectOrCreate(stack)
            | EngineCall::Create(stack)
            | EngineCall::Preview(stack)
            | EngineCall::Up(stack) => stack,
            EngineCall::SetConfig { stack, .. } => stack,
        }
    }
}

#[derive(Default)]
struct State {
    stacks: BTreeSet<String>,
    applied: BTreeSet<String>,
    config: BTreeMap<String, ConfigMap>,
    calls: Vec<EngineCall>,
}

#[derive(Default)]
pub struct InMemoryStackEngine {
    layer_outputs: BTreeMap<Layer, StackOutputs>,
    stack_outputs: BTreeMap<String, StackOutputs>,
    failures: BTreeSet<(String, Stage)>,
    state: Mutex<State>,
}

impl InMemoryStackEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outputs returned by `up` for every stack of a layer.
    pub fn with_layer_outputs(mut self, layer: Layer, outputs: StackOutputs) -> Self {
        self.layer_outputs.insert(layer, outputs);
        self
    }

    /// Outputs returned by `up` for one stack; takes precedence over layer outputs.
    pub fn with_stack_outputs(mut self, stack: impl Into<String>, outputs: StackOutputs) -> Self {
        self.stack_outputs.insert(stack.into(), outputs);
        self
    }

    /// Make a stack exist before the run starts.
    pub fn with_existing_stack(self, stack: impl Into<String>) -> Self {
        self.lock().stacks.insert(stack.into());
        self
    }

    /// Fail the given stage for the named stack.
    pub fn fail_at(mut self, stack: impl Into<String>, stage: Stage) -> Self {
        self.failures.insert((stack.into(), stage));
        self
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    /// Calls that targeted the named stack.
    pub fn calls_for(&self, stack: &str) -> Vec<EngineCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.stack() == stack)
            .cloned()
            .collect()
    }

    /// Configuration written so far for a stack.
    pub fn config(&self, stack: &str) -> Option<ConfigMap> {
        self.lock().config.get(stack).cloned()
    }

    pub fn stack_exists(&self, stack: &str) -> bool {
        self.lock().stacks.contains(stack)
    }

    /// Stacks applied at least once, in name order.
    pub fn applied(&self) -> Vec<String> {
        self.lock().applied.iter().cloned().collect()
    }

    fn canned_outputs(&self, stack: &StackRef) -> StackOutputs {
        self.stack_outputs
            .get(stack.name())
            .or_else(|| self.layer_outputs.get(&stack.layer()))
            .cloned()
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, stack: &StackRef, stage: Stage) -> Result<(), EngineError> {
        if self.failures.contains(&(stack.name().to_string(), stage)) {
            return Err(EngineError::CommandFailed {
                command: format!("{stage} {}", stack.name()),
                status: "exit status: 1".to_string(),
                stderr: format!("injected {stage} failure"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StackEngine for InMemoryStackEngine {
    async fn select_or_create_stack(&self, stack: &StackRef) -> Result<(), EngineError> {
        let mut state = self.lock();
        state.calls.push(EngineCall::SelectOrCreate(stack.name().to_string()));
        self.check(stack, Stage::Select)?;
        state.stacks.insert(stack.name().to_string());
        Ok(())
    }

    async fn create_stack(&self, stack: &StackRef) -> Result<(), EngineError> {
        let mut state = self.lock();
        state.calls.push(EngineCall::Create(stack.name().to_string()));
        self.check(stack, Stage::Create)?;
        if !state.stacks.insert(stack.name().to_string()) {
            return Err(EngineError::AlreadyExists {
                stack: stack.name().to_string(),
            });
        }
        Ok(())
    }

    async fn set_config(
        &self,
        stack: &StackRef,
        key: &str,
        value: &ConfigValue,
    ) -> Result<(), EngineError> {
        let mut state = self.lock();
        state.calls.push(EngineCall::SetConfig {
            stack: stack.name().to_string(),
            key: key.to_string(),
            value: value.clone(),
        });
        self.check(stack, Stage::Configure)?;
        if !state.stacks.contains(stack.name()) {
            return Err(EngineError::NotFound {
                stack: stack.name().to_string(),
            });
        }
        state
            .config
            .entry(stack.name().to_string())
            .or_default()
            .insert(key, value.clone());
        Ok(())
    }

    async fn preview(&self, stack: &StackRef) -> Result<ChangeSummary, EngineError> {
        let mut state = self.lock();
        state.calls.push(EngineCall::Preview(stack.name().to_string()));
        self.check(stack, Stage::Preview)?;
        if !state.stacks.contains(stack.name()) {
            return Err(EngineError::NotFound {
                stack: stack.name().to_string(),
            });
        }
        let mut summary = ChangeSummary::new();
        if state.applied.contains(stack.name()) {
            summary.record("same", 1);
        } else {
            summary.record("create", 1);
        }
        Ok(summary)
    }

    async fn up(&self, stack: &StackRef) -> Result<StackOutputs, EngineError> {
        let mut state = self.lock();
        state.calls.push(EngineCall::Up(stack.name().to_string()));
        self.check(stack, Stage::Apply)?;
        if !state.stacks.contains(stack.name()) {
            return Err(EngineError::NotFound {
                stack: stack.name().to_string(),
            });
        }
        state.applied.insert(stack.name().to_string());
        self.check(stack, Stage::Outputs)
            .map_err(|source| EngineError::OutputsUnavailable {
                stack: stack.name().to_string(),
                source: Box::new(source),
            })?;
        Ok(self.canned_outputs(stack))
    }

    async fn outputs(&self, stack: &StackRef) -> Result<StackOutputs, EngineError> {
        if !self.lock().applied.contains(stack.name()) {
            return Err(EngineError::NotFound {
                stack: stack.name().to_string(),
            });
        }
        Ok(self.canned_outputs(stack))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_core::{BaseEnvironment, ResolvedEnvironment};

    fn platform() -> StackRef {
        StackRef::shared(
            Layer::Platform,
            &ResolvedEnvironment::base(BaseEnvironment::Dev),
            "eastus",
        )
    }

    #[tokio::test]
    async fn test_create_twice_reports_already_exists() {
        let engine = InMemoryStackEngine::new();
        engine.create_stack(&platform()).await.unwrap();
        let err = engine.create_stack(&platform()).await.unwrap_err();
        assert!(matches!(err, EngineError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_config_requires_selected_stack() {
        let engine = InMemoryStackEngine::new();
        let err = engine
            .set_config(&platform(), "infrastructure:location", &"eastus".into())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_up_returns_layer_outputs_and_records_calls() {
        let engine = InMemoryStackEngine::new().with_layer_outputs(
            Layer::Platform,
            StackOutputs::from_iter([("clusterName", json!("aks-dev"))]),
        );
        let stack = platform();
        engine.select_or_create_stack(&stack).await.unwrap();
        assert_eq!(engine.preview(&stack).await.unwrap().count("create"), 1);
        let outputs = engine.up(&stack).await.unwrap();
        assert_eq!(outputs.get_str("clusterName"), Some("aks-dev"));
        assert_eq!(engine.preview(&stack).await.unwrap().count("same"), 1);
        assert_eq!(engine.calls_for("platform-dev-eastus").len(), 4);
        assert_eq!(engine.applied(), vec!["platform-dev-eastus".to_string()]);
    }

    #[tokio::test]
    async fn test_outputs_require_an_apply() {
        let engine = InMemoryStackEngine::new();
        let stack = platform();
        assert!(matches!(
            engine.outputs(&stack).await,
            Err(EngineError::NotFound { .. })
        ));
        engine.select_or_create_stack(&stack).await.unwrap();
        engine.up(&stack).await.unwrap();
        assert!(engine.outputs(&stack).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let engine = InMemoryStackEngine::new().fail_at("platform-dev-eastus", Stage::Apply);
        let stack = platform();
        engine.select_or_create_stack(&stack).await.unwrap();
        assert!(engine.up(&stack).await.is_err());
        assert!(engine.applied().is_empty());
    }
}
