//! Provider abstractions for the two external collaborators
//!
//! The semantic retriever and the generation engine are consumed behind
//! traits so any index structure or engine can be substituted without
//! changing the orchestration contract.

pub mod http;
pub mod llm;
pub mod ollama;
pub mod retriever;

pub use http::HttpRetriever;
pub use llm::{Completion, FragmentStream, GenerationEngine, StreamFragment};
pub use ollama::OllamaEngine;
pub use retriever::Retriever;
