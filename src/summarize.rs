//! Whole-document summarization via single-shot or map-reduce generation

use std::sync::Arc;

use crate::config::RagConfig;
use crate::context::estimate_tokens;
use crate::error::Result;
use crate::generation::PromptBuilder;
use crate::providers::{GenerationEngine, Retriever};
use crate::types::conversation::ChatMessage;
use crate::types::response::SummaryResult;
use uuid::Uuid;

/// Summarizes a full document, batching its chunks when they exceed
/// the generation token budget
pub struct Summarizer {
    retriever: Arc<dyn Retriever>,
    engine: Arc<dyn GenerationEngine>,
    batch_token_budget: usize,
    target_words: usize,
    max_tokens: u32,
    temperature: f32,
}

impl Summarizer {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        engine: Arc<dyn GenerationEngine>,
        config: &RagConfig,
    ) -> Self {
        Self {
            retriever,
            engine,
            batch_token_budget: config.summarize.batch_token_budget,
            target_words: config.summarize.target_words,
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
        }
    }

    /// Summarize every chunk of one document
    ///
    /// The document lookup runs first so an unknown id fails fast, before
    /// any chunk fetch. When the concatenated chunks exceed the token
    /// budget the text is partitioned into greedy token-bounded batches,
    /// each batch is summarized independently, and the batch summaries are
    /// reduced into one; the reduce step repeats if the summaries
    /// themselves still overflow.
    pub async fn summarize(&self, document_id: Uuid) -> Result<SummaryResult> {
        let info = self.retriever.document_info(document_id).await?;
        let chunks = self.retriever.chunks_of(document_id).await?;

        if chunks.is_empty() {
            tracing::warn!(%document_id, "document has no chunks to summarize");
            return Ok(SummaryResult {
                document_id,
                document_title: info.title,
                summary_text: String::new(),
                page_count: info.page_count,
                chunks_analyzed: 0,
            });
        }

        let chunks_analyzed = chunks.len();
        let pieces: Vec<String> = chunks.into_iter().map(|c| c.content).collect();
        let full_text = pieces.join("\n\n");

        let summary_text = if estimate_tokens(&full_text) <= self.batch_token_budget {
            tracing::debug!(%document_id, chunks = chunks_analyzed, "single-shot summary");
            self.summarize_text(&full_text).await?
        } else {
            self.map_reduce(&pieces, document_id).await?
        };

        Ok(SummaryResult {
            document_id,
            document_title: info.title,
            summary_text,
            page_count: info.page_count,
            chunks_analyzed,
        })
    }

    async fn map_reduce(&self, pieces: &[String], document_id: Uuid) -> Result<String> {
        let batches = fill_batches(pieces, self.batch_token_budget);
        tracing::info!(
            %document_id,
            batches = batches.len(),
            "document exceeds token budget, summarizing in batches"
        );

        let mut summaries = Vec::with_capacity(batches.len());
        for batch in &batches {
            summaries.push(self.summarize_text(batch).await?);
        }

        // Reduce until a single summary remains; each round either fits in
        // one call or re-batches the summaries and shrinks them again.
        while summaries.len() > 1 {
            let joined = summaries.join("\n\n");
            if estimate_tokens(&joined) <= self.batch_token_budget {
                summaries = vec![self.reduce_text(&joined).await?];
            } else {
                let rebatched = fill_batches(&summaries, self.batch_token_budget);
                tracing::debug!(
                    %document_id,
                    batches = rebatched.len(),
                    "batch summaries still overflow, reducing recursively"
                );
                let mut next = Vec::with_capacity(rebatched.len());
                for batch in &rebatched {
                    next.push(self.reduce_text(batch).await?);
                }
                summaries = next;
            }
        }

        Ok(summaries.pop().unwrap_or_default())
    }

    async fn summarize_text(&self, text: &str) -> Result<String> {
        let messages = vec![
            ChatMessage::system(PromptBuilder::summary_system_prompt(self.target_words)),
            ChatMessage::user(PromptBuilder::summary_user_message(text)),
        ];
        let completion = self
            .engine
            .complete(&messages, self.max_tokens, self.temperature)
            .await?;
        Ok(completion.text)
    }

    async fn reduce_text(&self, summaries: &str) -> Result<String> {
        let messages = vec![
            ChatMessage::system(PromptBuilder::summary_system_prompt(self.target_words)),
            ChatMessage::user(PromptBuilder::reduce_user_message(summaries)),
        ];
        let completion = self
            .engine
            .complete(&messages, self.max_tokens, self.temperature)
            .await?;
        Ok(completion.text)
    }
}

/// Greedy in-order partition of text pieces into token-bounded batches
///
/// A piece that alone exceeds the budget still gets its own batch, so no
/// input text is ever dropped.
fn fill_batches(pieces: &[String], token_budget: usize) -> Vec<String> {
    let mut batches = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_tokens = 0usize;

    for piece in pieces {
        let tokens = estimate_tokens(piece);
        if !current.is_empty() && current_tokens + tokens > token_budget {
            batches.push(current.join("\n\n"));
            current.clear();
            current_tokens = 0;
        }
        current.push(piece);
        current_tokens += tokens;
    }
    if !current.is_empty() {
        batches.push(current.join("\n\n"));
    }

    batches
}
