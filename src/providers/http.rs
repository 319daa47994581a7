//! HTTP client for an external semantic search service

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::types::passage::{DocumentChunk, DocumentInfo, RetrievedPassage};

use super::retriever::Retriever;

/// Retriever backed by a JSON search service
///
/// Expects `POST {base}/search`, `GET {base}/documents/{id}` and
/// `GET {base}/documents/{id}/chunks`.
pub struct HttpRetriever {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    top_k: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<RetrievedPassage>,
}

#[derive(Deserialize)]
struct ChunksResponse {
    chunks: Vec<DocumentChunk>,
}

impl HttpRetriever {
    /// Create a new retriever client from configuration
    pub fn new(config: &RetrievalConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Retriever for HttpRetriever {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedPassage>> {
        let url = format!("{}/search", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&SearchRequest { query, top_k })
            .send()
            .await
            .map_err(|e| Error::retrieval(format!("search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::retrieval(format!(
                "search failed: HTTP {}",
                response.status()
            )));
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::retrieval(format!("malformed search response: {}", e)))?;

        Ok(search.results)
    }

    async fn document_info(&self, document_id: Uuid) -> Result<DocumentInfo> {
        let url = format!("{}/documents/{}", self.base_url, document_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::retrieval(format!("document lookup failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::DocumentNotFound(document_id));
        }
        if !response.status().is_success() {
            return Err(Error::retrieval(format!(
                "document lookup failed: HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::retrieval(format!("malformed document response: {}", e)))
    }

    async fn chunks_of(&self, document_id: Uuid) -> Result<Vec<DocumentChunk>> {
        let url = format!("{}/documents/{}/chunks", self.base_url, document_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::retrieval(format!("chunk fetch failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::DocumentNotFound(document_id));
        }
        if !response.status().is_success() {
            return Err(Error::retrieval(format!(
                "chunk fetch failed: HTTP {}",
                response.status()
            )));
        }

        let chunks: ChunksResponse = response
            .json()
            .await
            .map_err(|e| Error::retrieval(format!("malformed chunks response: {}", e)))?;

        Ok(chunks.chunks)
    }
}
