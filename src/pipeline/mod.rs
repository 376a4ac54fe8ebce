// Data pipeline: bronze generation, silver cleaning, gold aggregation and the
// orchestrator that runs them in order

pub mod generate;
pub mod orchestrator;
pub mod processing;

pub use orchestrator::{PipelineOrchestrator, PipelineRunSummary, RunOptions};
