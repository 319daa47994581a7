//! API routes for the Q&A server

pub mod query;

use axum::{
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ask", post(query::ask))
        .route("/ask/stream", post(query::ask_stream))
        .route("/conversation", post(query::conversation))
        .route("/summarize", post(query::summarize))
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "docqa",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Grounded document Q&A with citations, confidence, and streaming",
        "endpoints": {
            "POST /api/ask": "Answer a question with citations",
            "POST /api/ask/stream": "Answer a question as server-sent events",
            "POST /api/conversation": "Answer with prior conversation turns",
            "POST /api/summarize": "Summarize a whole document",
            "GET /health": "Liveness check",
            "GET /ready": "Readiness check (generation engine reachable)"
        }
    }))
}
