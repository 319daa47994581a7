//! Question-answering endpoints: atomic, streaming, and conversational

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::{Stream, StreamExt};
use std::time::Instant;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{
    query::{AskRequest, ConversationRequest, SummarizeRequest},
    response::{Answer, SummaryResult},
};

/// POST /api/ask - Answer a question with citations
pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<Answer>> {
    let start = Instant::now();
    tracing::info!(question = %request.question, top_k = request.top_k, "ask");

    let answer = state.orchestrator().ask(&request).await?;

    tracing::info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        citations = answer.citations.len(),
        confidence = ?answer.confidence,
        "ask completed"
    );

    Ok(Json(answer))
}

/// POST /api/ask/stream - Answer a question as server-sent events
///
/// Emits the event protocol directly: `sources`, then `answer` fragments,
/// then one `done` or `error`. Dropping the connection cancels the
/// in-flight generation.
pub async fn ask_stream(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    tracing::info!(question = %request.question, top_k = request.top_k, "ask (streaming)");

    let events = state.orchestrator().clone().ask_stream(request, Vec::new());

    let stream = events.map(|event| {
        Ok(match Event::default().json_data(&event) {
            Ok(sse_event) => sse_event,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode stream event");
                Event::default().data(
                    r#"{"type":"error","data":{"kind":"internal_error","message":"event encoding failed"}}"#,
                )
            }
        })
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// POST /api/conversation - Answer a question with prior conversation turns
pub async fn conversation(
    State(state): State<AppState>,
    Json(request): Json<ConversationRequest>,
) -> Result<Json<Answer>> {
    let start = Instant::now();
    tracing::info!(
        question = %request.question,
        history_turns = request.conversation_history.len(),
        "conversation ask"
    );

    let ask_request = AskRequest::new(request.question).with_top_k(request.top_k);
    let answer = state
        .orchestrator()
        .ask_with_history(&ask_request, &request.conversation_history)
        .await?;

    tracing::info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        confidence = ?answer.confidence,
        "conversation ask completed"
    );

    Ok(Json(answer))
}

/// POST /api/summarize - Summarize a whole document
pub async fn summarize(
    State(state): State<AppState>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<SummaryResult>> {
    let start = Instant::now();
    tracing::info!(document_id = %request.document_id, "summarize");

    let result = state.summarizer().summarize(request.document_id).await?;

    tracing::info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        chunks_analyzed = result.chunks_analyzed,
        "summarize completed"
    );

    Ok(Json(result))
}
