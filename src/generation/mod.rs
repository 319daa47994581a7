//! Answer generation: prompt construction, orchestration, citation binding

pub mod citation;
pub mod orchestrator;
pub mod prompt;

pub use orchestrator::Orchestrator;
pub use prompt::PromptBuilder;
