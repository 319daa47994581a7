//! Streaming event protocol for incremental answers
//!
//! A streamed answer is an ordered event sequence: one `sources` event,
//! zero or more `answer` fragments, then exactly one terminal `done` or
//! `error`. Nothing follows a terminal event.

use serde::{Deserialize, Serialize};

use crate::confidence::ConfidenceLevel;
use crate::types::response::{Citation, TokenUsage};

/// One event of a streamed answer
///
/// Serializes as `{"type": ..., "data": ...}`, ready for SSE framing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Full citation list, emitted before any answer text exists
    Sources(Vec<Citation>),
    /// Incremental answer fragment, in emission order
    Answer(String),
    /// Successful completion with usage accounting
    Done(StreamCompletion),
    /// Failure, terminal
    Error(StreamError),
}

impl StreamEvent {
    /// Whether this event terminates the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done(_) | StreamEvent::Error(_))
    }
}

/// Payload of the terminal `done` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamCompletion {
    /// Token usage, only known at stream completion
    pub usage: TokenUsage,
    /// Confidence over the included relevance scores
    pub confidence: ConfidenceLevel,
    /// Number of passages included in the context block
    pub context_used: usize,
}

/// Payload of the terminal `error` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamError {
    /// Machine-readable error kind
    pub kind: String,
    /// Human-readable message
    pub message: String,
}

impl From<&crate::error::Error> for StreamError {
    fn from(err: &crate::error::Error) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_discriminator() {
        let event = StreamEvent::Answer("hello".to_string());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "answer");
        assert_eq!(json["data"], "hello");
    }

    #[test]
    fn done_carries_usage() {
        let event = StreamEvent::Done(StreamCompletion {
            usage: TokenUsage::new(10, 20),
            confidence: ConfidenceLevel::High,
            context_used: 3,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "done");
        assert_eq!(json["data"]["usage"]["total_tokens"], 30);
        assert_eq!(json["data"]["confidence"], "high");
    }

    #[test]
    fn terminal_detection() {
        assert!(StreamEvent::Done(StreamCompletion {
            usage: TokenUsage::default(),
            confidence: ConfidenceLevel::None,
            context_used: 0,
        })
        .is_terminal());
        assert!(!StreamEvent::Answer(String::new()).is_terminal());
        assert!(!StreamEvent::Sources(Vec::new()).is_terminal());
    }
}
