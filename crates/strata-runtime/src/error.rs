use strata_core::Layer;
use strata_policy::ConfigurationError;

use crate::engine::{EngineError, Stage};
use crate::events::LayerReport;
use crate::layers::MissingUpstream;

/// A pipeline run stopped. Layers before the failing one stay applied and are
/// listed in `completed`; later layers were never attempted.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("{layer} layer cannot start: {source}")]
    MissingUpstream {
        layer: Layer,
        source: MissingUpstream,
        completed: Vec<LayerReport>,
    },

    #[error("{layer} layer failed at {stage} on stack '{stack}': {source}")]
    Layer {
        layer: Layer,
        stack: String,
        stage: Stage,
        source: EngineError,
        completed: Vec<LayerReport>,
    },
}

impl PipelineError {
    /// Layer that stopped the run, if any engine work had started.
    pub fn layer(&self) -> Option<Layer> {
        match self {
            PipelineError::Configuration(_) => None,
            PipelineError::MissingUpstream { layer, .. } | PipelineError::Layer { layer, .. } => {
                Some(*layer)
            }
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Layer { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Layers applied before the failure.
    pub fn completed(&self) -> &[LayerReport] {
        match self {
            PipelineError::Configuration(_) => &[],
            PipelineError::MissingUpstream { completed, .. }
            | PipelineError::Layer { completed, .. } => completed,
        }
    }
}

/// Onboarding a tenant failed.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("tenant '{tenant_id}' is already onboarded (stack '{stack}')")]
    TenantAlreadyOnboarded { tenant_id: String, stack: String },

    #[error("tenant '{tenant_id}' cannot be provisioned: {source}")]
    MissingUpstream {
        tenant_id: String,
        source: MissingUpstream,
    },

    #[error("stack '{stack}' is targeted by more than one tenant in the batch")]
    DuplicateStack { stack: String },

    #[error("tenant '{tenant_id}' failed at {stage} on stack '{stack}': {source}")]
    Engine {
        tenant_id: String,
        stack: String,
        stage: Stage,
        source: EngineError,
    },
}
