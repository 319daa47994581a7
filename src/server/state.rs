//! Application state for the Q&A server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::generation::Orchestrator;
use crate::providers::{GenerationEngine, HttpRetriever, OllamaEngine, Retriever};
use crate::summarize::Summarizer;

/// Shared application state
///
/// Everything inside is immutable after startup; requests share it
/// through cheap Arc clones.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    engine: Arc<dyn GenerationEngine>,
    orchestrator: Arc<Orchestrator>,
    summarizer: Summarizer,
}

impl AppState {
    /// Wire up the retriever and generation engine from configuration
    pub fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("initializing application state");

        let retriever: Arc<dyn Retriever> = Arc::new(HttpRetriever::new(&config.retrieval)?);
        tracing::info!(base_url = %config.retrieval.base_url, "retriever client initialized");

        let engine: Arc<dyn GenerationEngine> = Arc::new(OllamaEngine::new(&config.llm)?);
        tracing::info!(
            base_url = %config.llm.base_url,
            model = %config.llm.model,
            "generation engine initialized"
        );

        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&retriever),
            Arc::clone(&engine),
            &config,
        ));
        let summarizer = Summarizer::new(Arc::clone(&retriever), Arc::clone(&engine), &config);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                engine,
                orchestrator,
                summarizer,
            }),
        })
    }

    /// Build state around externally-supplied collaborators
    pub fn with_providers(
        config: RagConfig,
        retriever: Arc<dyn Retriever>,
        engine: Arc<dyn GenerationEngine>,
    ) -> Self {
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&retriever),
            Arc::clone(&engine),
            &config,
        ));
        let summarizer = Summarizer::new(retriever, Arc::clone(&engine), &config);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                engine,
                orchestrator,
                summarizer,
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the generation engine
    pub fn engine(&self) -> &Arc<dyn GenerationEngine> {
        &self.inner.engine
    }

    /// Get the answer orchestrator
    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.inner.orchestrator
    }

    /// Get the document summarizer
    pub fn summarizer(&self) -> &Summarizer {
        &self.inner.summarizer
    }
}
