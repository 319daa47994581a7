//! Q&A server binary
//!
//! Run with: cargo run --bin docqa-server [config.toml]

use docqa::{config::RagConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Optional TOML config path as the first argument.
    let config = match std::env::args().nth(1) {
        Some(path) => RagConfig::from_file(&path)?,
        None => RagConfig::default(),
    };

    tracing::info!("configuration loaded");
    tracing::info!("  - retrieval service: {}", config.retrieval.base_url);
    tracing::info!("  - generation model: {}", config.llm.model);
    tracing::info!("  - context token budget: {}", config.context.token_budget);

    tracing::info!("checking generation engine at {}...", config.llm.base_url);
    let client = reqwest::Client::new();
    match client
        .get(format!("{}/api/tags", config.llm.base_url))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            tracing::info!("generation engine is running");
        }
        _ => {
            tracing::warn!("generation engine not available at {}", config.llm.base_url);
            tracing::warn!("start Ollama and pull the configured model:");
            tracing::warn!("  1. ollama serve");
            tracing::warn!("  2. ollama pull {}", config.llm.model);
        }
    }

    let server = RagServer::new(config)?;

    tracing::info!("API: http://{}", server.address());
    tracing::info!("Health: http://{}/health", server.address());
    tracing::info!("API info: http://{}/api/info", server.address());

    server.start().await?;

    Ok(())
}
