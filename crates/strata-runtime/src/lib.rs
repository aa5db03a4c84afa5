//! Strata runtime: the layered stack pipeline and tenant provisioning.
//!
//! The [`Orchestrator`] applies the platform, services and application layers
//! in order through a [`StackEngine`], forwarding each layer's declared
//! upstream outputs. The [`TenantProvisioner`] onboards a single tenant's
//! application stack.

pub mod engine;
pub mod error;
pub mod events;
pub mod layers;
pub mod memory;
pub mod orchestrator;
pub mod tenant;

pub use engine::{EngineError, StackEngine, Stage};
pub use error::{PipelineError, ProvisionError};
pub use events::{
    LayerReport, PipelineEvent, PipelineObserver, PipelineReport, RecordingObserver,
    TracingObserver,
};
pub use layers::{LayerDescriptor, MissingUpstream, PIPELINE, UpstreamBinding};
pub use memory::{EngineCall, InMemoryStackEngine};
pub use orchestrator::{LayerPlan, Orchestrator, PipelinePlan, PipelineSettings, plan_pipeline};
pub use tenant::{ProvisionOptions, TenantProvisioner, TenantReport};
