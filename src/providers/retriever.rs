//! Semantic retriever trait

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::passage::{DocumentChunk, DocumentInfo, RetrievedPassage};

/// Trait for semantic retrieval over the ingested corpus
///
/// Implementations:
/// - `HttpRetriever`: JSON client against a vector search service
/// - stub retrievers in the orchestrator and summarizer test modules
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Search for the `top_k` most relevant passages for a query
    ///
    /// Results must arrive ordered by descending relevance_score and may
    /// number fewer than `top_k`, including zero.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedPassage>>;

    /// Look up document metadata
    ///
    /// Returns `Error::DocumentNotFound` for an unknown id; callers rely
    /// on this to fail summarization before any chunk fetch.
    async fn document_info(&self, document_id: Uuid) -> Result<DocumentInfo>;

    /// Fetch all chunks of a document, ordered by original position
    async fn chunks_of(&self, document_id: Uuid) -> Result<Vec<DocumentChunk>>;
}
