//! Configuration for the Q&A pipeline

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Semantic retriever configuration
    pub retrieval: RetrievalConfig,
    /// Generation engine (Ollama) configuration
    pub llm: LlmConfig,
    /// Context assembly configuration
    pub context: ContextConfig,
    /// Confidence thresholds
    pub confidence: ConfidenceThresholds,
    /// Summarization configuration
    pub summarize: SummarizeConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("invalid config file: {}", e)))
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
        }
    }
}

/// Semantic retriever configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Base URL of the semantic search service
    pub base_url: String,
    /// Default number of passages to retrieve per question
    pub default_top_k: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7700".to_string(),
            default_top_k: 5,
            timeout_secs: 30,
        }
    }
}

/// Generation engine (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum completion tokens per call
    pub max_tokens: u32,
    /// Total timeout for an atomic generation call, in seconds
    pub timeout_secs: u64,
    /// Inactivity timeout between streamed fragments, in seconds
    pub stream_idle_timeout_secs: u64,
    /// Context window size of the model (tokens)
    pub context_window: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            temperature: 0.3, // Lower for more factual answers
            max_tokens: 1024,
            timeout_secs: 120,
            stream_idle_timeout_secs: 60,
            context_window: 4096,
        }
    }
}

/// Context assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Hard token budget for the rendered context block
    pub token_budget: usize,
    /// Fixed per-citation formatting overhead, in tokens
    pub citation_overhead_tokens: usize,
    /// Maximum characters for citation content previews
    pub preview_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            token_budget: 3072,
            citation_overhead_tokens: 16,
            preview_chars: 200,
        }
    }
}

/// Confidence level thresholds over included relevance scores
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    /// Scores strictly above this are high confidence
    pub high: f32,
    /// Scores at or above this (and not high) are medium confidence
    pub medium: f32,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: 0.8,
            medium: 0.6,
        }
    }
}

/// Summarization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizeConfig {
    /// Token budget for one summarization input batch
    pub batch_token_budget: usize,
    /// Approximate target length of the final summary, in words
    pub target_words: usize,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            batch_token_budget: 3072,
            target_words: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = RagConfig::default();
        assert!(config.confidence.high > config.confidence.medium);
        assert!(config.context.token_budget > 0);
        assert_eq!(config.retrieval.default_top_k, 5);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: RagConfig = toml::from_str(
            r#"
            [llm]
            model = "phi3"
            temperature = 0.1
            "#,
        )
        .unwrap();

        assert_eq!(config.llm.model, "phi3");
        assert_eq!(config.llm.temperature, 0.1);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.context.token_budget, 3072);
    }
}
