//! Retrieved passage types produced by the semantic retriever

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A passage returned by the semantic retriever for a query
///
/// Immutable once produced. Multiple passages may share a `document_id`
/// (different pages of the same document may all be relevant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// Opaque chunk identifier
    pub chunk_id: Uuid,
    /// Parent document identifier
    pub document_id: Uuid,
    /// Title of the parent document
    pub document_title: String,
    /// Page or location marker within the document
    pub page_number: Option<u32>,
    /// Literal passage text
    pub content: String,
    /// Relevance score in [0, 1], higher = more relevant
    pub relevance_score: f32,
}

/// One chunk of a document, as returned by the bulk chunk fetch
/// (ordered by original position within the document)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Chunk text
    pub content: String,
    /// Page number the chunk came from
    pub page_number: Option<u32>,
}

/// Document metadata, as returned by the retriever's document lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// Document identifier
    pub id: Uuid,
    /// Document title
    pub title: String,
    /// Number of pages in the document
    pub page_count: u32,
    /// When the document entered the corpus
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}
