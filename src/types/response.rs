//! Response types for Q&A and summarization

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::passage::RetrievedPassage;

/// Citation pointing from an answer back to a retrieved passage
///
/// Derived 1:1 from the context entries actually presented to the
/// generation engine, whether or not the generated text referenced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Citation index within the context block (1..N)
    pub source_index: usize,
    /// Chunk the passage came from
    pub chunk_id: Uuid,
    /// Parent document
    pub document_id: Uuid,
    /// Document title
    pub document_title: String,
    /// Page number, if known
    pub page_number: Option<u32>,
    /// Relevance score of the cited passage
    pub relevance_score: f32,
    /// Truncated preview of the passage text
    pub content_preview: String,
}

impl Citation {
    /// Build a citation from an included passage
    pub fn from_passage(source_index: usize, passage: &RetrievedPassage, preview_chars: usize) -> Self {
        Self {
            source_index,
            chunk_id: passage.chunk_id,
            document_id: passage.document_id,
            document_title: passage.document_title.clone(),
            page_number: passage.page_number,
            relevance_score: passage.relevance_score,
            content_preview: preview(&passage.content, preview_chars),
        }
    }
}

/// Truncate text to a preview, ending at a character boundary
fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}...", truncated)
}

/// Token accounting reported by the generation engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// A generated answer with citations, confidence, and usage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Generated answer text
    pub text: String,
    /// Citations for every passage presented to the engine
    pub citations: Vec<Citation>,
    /// Confidence over the included relevance scores
    pub confidence: crate::confidence::ConfidenceLevel,
    /// Number of passages included in the context block
    pub context_used: usize,
    /// Model that produced the answer
    pub model: String,
    /// Token usage for the request
    pub usage: TokenUsage,
}

/// Result of whole-document summarization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResult {
    /// Document that was summarized
    pub document_id: Uuid,
    /// Document title
    pub document_title: String,
    /// Generated summary text
    pub summary_text: String,
    /// Number of pages in the document
    pub page_count: u32,
    /// Total chunk count fed into the map phase
    pub chunks_analyzed: usize,
}
