//! Core types for the Q&A pipeline

pub mod conversation;
pub mod passage;
pub mod query;
pub mod response;
pub mod stream;

pub use conversation::{ChatMessage, ChatRole, ConversationTurn, Role};
pub use passage::{DocumentChunk, DocumentInfo, RetrievedPassage};
pub use query::{AskRequest, ConversationRequest, SummarizeRequest};
pub use response::{Answer, Citation, SummaryResult, TokenUsage};
pub use stream::{StreamCompletion, StreamError, StreamEvent};
