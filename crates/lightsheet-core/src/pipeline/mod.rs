pub mod config;
mod confirm;
mod orchestrator;
mod types;

pub use confirm::{decide_fusion, FusionConfirmation, FusionPlan, PolicyConfirmation};
pub use orchestrator::PipelineController;
pub use types::{Job, NoOpReporter, ProgressReporter, Stage, StageResult, StageStatus};
