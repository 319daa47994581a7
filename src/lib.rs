//! docqa: grounded question answering over a document corpus
//!
//! Takes a natural-language question, retrieves relevant passages from an
//! external semantic search service, assembles a token-bounded context
//! block, and drives an answer-generation engine in atomic or streaming
//! mode. Answers carry source citations, a confidence label, and token
//! usage. Whole-document summarization falls back to map-reduce when a
//! document exceeds the generation token budget.

pub mod confidence;
pub mod config;
pub mod context;
pub mod conversation;
pub mod error;
pub mod generation;
pub mod providers;
pub mod server;
pub mod summarize;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use types::{
    conversation::ConversationTurn,
    passage::RetrievedPassage,
    query::AskRequest,
    response::{Answer, Citation, SummaryResult},
    stream::StreamEvent,
};
