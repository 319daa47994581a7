//! Generation engine trait

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::error::Result;
use crate::types::conversation::ChatMessage;
use crate::types::response::TokenUsage;

/// A completed generation call
#[derive(Debug, Clone)]
pub struct Completion {
    /// Full generated text
    pub text: String,
    /// Token accounting for the call
    pub usage: TokenUsage,
}

/// One fragment of a streamed generation
#[derive(Debug, Clone)]
pub enum StreamFragment {
    /// Incremental text, in emission order
    Text(String),
    /// Final fragment carrying usage; the stream ends after this
    Done(TokenUsage),
}

/// Boxed stream of generation fragments
///
/// Dropping the stream cancels the in-flight generation and releases the
/// underlying connection.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<StreamFragment>> + Send>>;

/// Trait for LLM-based answer generation
///
/// Implementations:
/// - `OllamaEngine`: local Ollama server via `/api/chat`
/// - scripted engines in the orchestrator and summarizer test modules
#[async_trait]
pub trait GenerationEngine: Send + Sync {
    /// Generate a complete response for the message sequence
    async fn complete(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<Completion>;

    /// Generate a streamed response for the message sequence
    ///
    /// The concatenation of all `Text` fragments equals the text a
    /// `complete` call would produce for the same input, given a
    /// deterministic engine. Exactly one `Done` fragment closes a
    /// successful stream.
    async fn stream(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<FragmentStream>;

    /// Model identifier, for response metadata and logging
    fn model(&self) -> &str;

    /// Check whether the engine is reachable
    async fn health_check(&self) -> Result<bool>;
}
