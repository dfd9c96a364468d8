pub mod logistics;
pub mod market;
pub mod orchestrator;
pub mod recommendation;
pub mod storage;

pub use orchestrator::{AgentMetadata, Orchestrator, PipelineFailure, PlanReport, Stage};
