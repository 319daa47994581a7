//! Request types for the Q&A endpoints

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::conversation::ConversationTurn;

/// Request for answering a question over the corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// The question to answer
    pub question: String,

    /// Number of passages to retrieve (default: 5)
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Whether to include source citations in the response (default: true)
    #[serde(default = "default_include_sources")]
    pub include_sources: bool,

    /// Custom system prompt, overriding the default grounding prompt
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_top_k() -> usize {
    5
}

fn default_include_sources() -> bool {
    true
}

impl AskRequest {
    /// Create a request with default parameters
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            top_k: default_top_k(),
            include_sources: true,
            system_prompt: None,
        }
    }

    /// Set the number of passages to retrieve
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Override the system prompt for this request
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Request for multi-turn conversation Q&A
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRequest {
    /// Current question
    pub question: String,

    /// Prior turns, oldest first; caller-owned and passed through read-only
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,

    /// Number of passages to retrieve (default: 5)
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

/// Request for whole-document summarization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeRequest {
    /// Document to summarize
    pub document_id: Uuid,
}
