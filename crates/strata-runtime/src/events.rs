use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use strata_core::{ChangeSummary, Layer, StackOutputs};
use uuid::Uuid;

use crate::engine::Stage;

/// Progress of a pipeline run or tenant provisioning.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    LayerStarted {
        layer: Layer,
        stack: String,
    },
    ConfigWritten {
        layer: Layer,
        stack: String,
        keys: usize,
        upstream: usize,
    },
    Previewed {
        layer: Layer,
        stack: String,
        changes: ChangeSummary,
    },
    Applied {
        layer: Layer,
        stack: String,
        outputs: usize,
    },
    LayerSkipped {
        layer: Layer,
        reason: String,
    },
    LayerFailed {
        layer: Layer,
        stack: String,
        stage: Stage,
        error: String,
    },
}

/// Receives pipeline events as they happen.
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

impl<O: PipelineObserver + ?Sized> PipelineObserver for Arc<O> {
    fn on_event(&self, event: &PipelineEvent) {
        (**self).on_event(event)
    }
}

/// Logs every event with `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::LayerStarted { layer, stack } => {
                tracing::info!(%layer, %stack, "Layer started");
            }
            PipelineEvent::ConfigWritten {
                layer,
                stack,
                keys,
                upstream,
            } => {
                tracing::debug!(%layer, %stack, keys, upstream, "Stack configuration written");
            }
            PipelineEvent::Previewed {
                layer,
                stack,
                changes,
            } => {
                tracing::info!(%layer, %stack, %changes, "Preview complete");
            }
            PipelineEvent::Applied {
                layer,
                stack,
                outputs,
            } => {
                tracing::info!(%layer, %stack, outputs, "Layer applied");
            }
            PipelineEvent::LayerSkipped { layer, reason } => {
                tracing::info!(%layer, %reason, "Layer skipped");
            }
            PipelineEvent::LayerFailed {
                layer,
                stack,
                stage,
                error,
            } => {
                tracing::error!(%layer, %stack, %stage, %error, "Layer failed");
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Result of applying one stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerReport {
    pub layer: Layer,
    pub stack: String,
    pub changes: ChangeSummary,
    pub output_keys: Vec<String>,
    #[serde(skip)]
    pub outputs: StackOutputs,
}

impl LayerReport {
    pub fn new(layer: Layer, stack: impl Into<String>, changes: ChangeSummary, outputs: StackOutputs) -> Self {
        Self {
            layer,
            stack: stack.into(),
            changes,
            output_keys: outputs.keys().cloned().collect(),
            outputs,
        }
    }
}

/// Outcome of a complete pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub environment: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub layers: Vec<LayerReport>,
    pub skipped: Vec<Layer>,
}

impl PipelineReport {
    pub fn layer(&self, layer: Layer) -> Option<&LayerReport> {
        self.layers.iter().find(|r| r.layer == layer)
    }

    pub fn outputs(&self, layer: Layer) -> Option<&StackOutputs> {
        self.layer(layer).map(|r| &r.outputs)
    }

    pub fn applied_stacks(&self) -> Vec<&str> {
        self.layers.iter().map(|r| r.stack.as_str()).collect()
    }
}
