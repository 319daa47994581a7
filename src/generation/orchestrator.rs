//! Generation orchestration: retrieval, context assembly, confidence,
//! and answer delivery in atomic or streaming mode

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::config::{ConfidenceThresholds, RagConfig};
use crate::confidence::ConfidenceLevel;
use crate::context::{ContextAssembler, ContextBlock};
use crate::conversation::merge_conversation;
use crate::error::{Error, Result};
use crate::providers::{GenerationEngine, Retriever, StreamFragment};
use crate::types::conversation::{ChatMessage, ConversationTurn};
use crate::types::query::AskRequest;
use crate::types::response::{Answer, Citation, TokenUsage};
use crate::types::stream::{StreamCompletion, StreamEvent};

use super::citation::resolve_markers;
use super::prompt::PromptBuilder;

/// Phases of one streaming response
///
/// `SourcesEmitted` always precedes any answer fragment; no transition
/// skips a phase. `Error` is reachable from any non-terminal phase,
/// `Cancelled` from `Generating` on caller disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamPhase {
    Init,
    Retrieved,
    SourcesEmitted,
    Generating,
    Done,
    Error,
    Cancelled,
}

impl StreamPhase {
    fn advance(&mut self, next: StreamPhase) {
        debug_assert!(
            self.allows(next),
            "illegal stream transition {:?} -> {:?}",
            self,
            next
        );
        *self = next;
    }

    fn allows(self, next: StreamPhase) -> bool {
        use StreamPhase::*;
        matches!(
            (self, next),
            (Init, Retrieved)
                | (Retrieved, SourcesEmitted)
                | (SourcesEmitted, Generating)
                | (Generating, Done)
                | (Init | Retrieved | SourcesEmitted | Generating, Error)
                | (Generating, Cancelled)
        )
    }
}

/// Everything the setup phase produces, shared by both delivery modes
struct Prepared {
    block: ContextBlock,
    citations: Vec<Citation>,
    confidence: ConfidenceLevel,
    messages: Vec<ChatMessage>,
}

/// Drives one question through retrieval, context assembly, and generation
///
/// Holds no mutable state: every request is an independent value-object
/// pipeline, so concurrent questions never interact.
pub struct Orchestrator {
    retriever: Arc<dyn Retriever>,
    engine: Arc<dyn GenerationEngine>,
    assembler: ContextAssembler,
    thresholds: ConfidenceThresholds,
    preview_chars: usize,
    max_tokens: u32,
    temperature: f32,
    retrieval_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        engine: Arc<dyn GenerationEngine>,
        config: &RagConfig,
    ) -> Self {
        Self {
            retriever,
            engine,
            assembler: ContextAssembler::new(&config.context),
            thresholds: config.confidence,
            preview_chars: config.context.preview_chars,
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
            retrieval_timeout: Duration::from_secs(config.retrieval.timeout_secs),
        }
    }

    /// Answer a question atomically
    pub async fn ask(&self, request: &AskRequest) -> Result<Answer> {
        self.ask_with_history(request, &[]).await
    }

    /// Answer a question atomically, with prior conversation turns
    pub async fn ask_with_history(
        &self,
        request: &AskRequest,
        history: &[ConversationTurn],
    ) -> Result<Answer> {
        let prepared = self
            .prepare(
                &request.question,
                request.top_k,
                request.system_prompt.as_deref(),
                history,
            )
            .await?;

        let completion = self
            .engine
            .complete(&prepared.messages, self.max_tokens, self.temperature)
            .await?;

        let (text, referenced) = resolve_markers(&completion.text, prepared.block.len());

        tracing::info!(
            context_used = prepared.block.len(),
            referenced = referenced.len(),
            confidence = ?prepared.confidence,
            total_tokens = completion.usage.total_tokens,
            "answer generated"
        );

        let citations = if request.include_sources {
            prepared.citations
        } else {
            Vec::new()
        };

        Ok(Answer {
            text,
            citations,
            confidence: prepared.confidence,
            context_used: prepared.block.len(),
            model: self.engine.model().to_string(),
            usage: completion.usage,
        })
    }

    /// Answer a question as an ordered event stream
    ///
    /// The first event is `sources`; answer fragments follow; exactly one
    /// terminal `done` or `error` closes the stream. If the caller stops
    /// consuming, the forwarding task notices the closed channel, stops
    /// requesting generation, and drops the engine stream, releasing the
    /// underlying connection. A cancelled request emits no terminal event.
    pub fn ask_stream(
        self: Arc<Self>,
        request: AskRequest,
        history: Vec<ConversationTurn>,
    ) -> ReceiverStream<StreamEvent> {
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            self.run_stream(request, history, tx).await;
        });
        ReceiverStream::new(rx)
    }

    async fn run_stream(
        self: Arc<Self>,
        request: AskRequest,
        history: Vec<ConversationTurn>,
        tx: mpsc::Sender<StreamEvent>,
    ) {
        let mut phase = StreamPhase::Init;

        let prepared = match self
            .prepare(
                &request.question,
                request.top_k,
                request.system_prompt.as_deref(),
                history.as_slice(),
            )
            .await
        {
            Ok(prepared) => prepared,
            Err(e) => {
                phase.advance(StreamPhase::Error);
                let _ = tx.send(StreamEvent::Error((&e).into())).await;
                return;
            }
        };
        phase.advance(StreamPhase::Retrieved);

        let citations = if request.include_sources {
            prepared.citations.clone()
        } else {
            Vec::new()
        };
        if tx.send(StreamEvent::Sources(citations)).await.is_err() {
            // Caller went away before generation began; nothing to release yet.
            return;
        }
        phase.advance(StreamPhase::SourcesEmitted);

        let mut fragments = match self
            .engine
            .stream(&prepared.messages, self.max_tokens, self.temperature)
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                phase.advance(StreamPhase::Error);
                let _ = tx.send(StreamEvent::Error((&e).into())).await;
                return;
            }
        };
        phase.advance(StreamPhase::Generating);

        let mut text = String::new();
        let mut usage = TokenUsage::default();

        loop {
            tokio::select! {
                _ = tx.closed() => {
                    phase.advance(StreamPhase::Cancelled);
                    tracing::debug!("caller disconnected mid-stream, releasing engine connection");
                    return;
                }
                item = fragments.next() => match item {
                    Some(Ok(StreamFragment::Text(fragment))) => {
                        text.push_str(&fragment);
                        if tx.send(StreamEvent::Answer(fragment)).await.is_err() {
                            phase.advance(StreamPhase::Cancelled);
                            tracing::debug!("caller disconnected mid-stream, releasing engine connection");
                            return;
                        }
                    }
                    Some(Ok(StreamFragment::Done(reported))) => {
                        usage = reported;
                        break;
                    }
                    Some(Err(e)) => {
                        phase.advance(StreamPhase::Error);
                        let _ = tx.send(StreamEvent::Error((&e).into())).await;
                        return;
                    }
                    None => break,
                }
            }
        }

        // Fragments were already delivered, so dangling markers cannot be
        // rewritten here; they are only detected and logged.
        let (_, referenced) = resolve_markers(&text, prepared.block.len());

        tracing::info!(
            context_used = prepared.block.len(),
            referenced = referenced.len(),
            total_tokens = usage.total_tokens,
            "stream complete"
        );

        phase.advance(StreamPhase::Done);
        let _ = tx
            .send(StreamEvent::Done(StreamCompletion {
                usage,
                confidence: prepared.confidence,
                context_used: prepared.block.len(),
            }))
            .await;
    }

    /// Shared setup: retrieve, assemble, estimate, and build the input
    async fn prepare(
        &self,
        question: &str,
        top_k: usize,
        system_prompt: Option<&str>,
        history: &[ConversationTurn],
    ) -> Result<Prepared> {
        let passages = tokio::time::timeout(
            self.retrieval_timeout,
            self.retriever.search(question, top_k),
        )
        .await
        .map_err(|_| Error::retrieval("search timed out"))??;

        tracing::debug!(retrieved = passages.len(), top_k, "retrieval complete");

        let block = self.assembler.assemble(&passages);
        let confidence = ConfidenceLevel::for_block(&block, &self.thresholds);
        let citations = block.citations(self.preview_chars);

        let user_message = PromptBuilder::user_message(question, &block.render());
        let messages = merge_conversation(
            PromptBuilder::system_prompt(system_prompt),
            history,
            user_message,
        );

        Ok(Prepared {
            block,
            citations,
            confidence,
            messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use futures_util::stream;

    use crate::types::passage::{DocumentChunk, DocumentInfo, RetrievedPassage};
    use uuid::Uuid;

    struct StubRetriever {
        passages: Vec<RetrievedPassage>,
    }

    #[async_trait::async_trait]
    impl Retriever for StubRetriever {
        async fn search(&self, _query: &str, _top_k: usize) -> Result<Vec<RetrievedPassage>> {
            Ok(self.passages.clone())
        }

        async fn document_info(&self, document_id: Uuid) -> Result<DocumentInfo> {
            Err(Error::DocumentNotFound(document_id))
        }

        async fn chunks_of(&self, document_id: Uuid) -> Result<Vec<DocumentChunk>> {
            Err(Error::DocumentNotFound(document_id))
        }
    }

    /// Engine double returning a fixed answer, with the same text split
    /// into fragments for streaming mode
    struct ScriptedEngine {
        answer: String,
        fragments: Vec<String>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
        // When set, the stream never completes after its fragments; used
        // to exercise caller disconnect.
        hold_open: bool,
        stream_released: Arc<AtomicBool>,
    }

    impl ScriptedEngine {
        fn new(answer: &str, fragments: &[&str]) -> Self {
            Self {
                answer: answer.to_string(),
                fragments: fragments.iter().map(|f| f.to_string()).collect(),
                seen: Mutex::new(Vec::new()),
                hold_open: false,
                stream_released: Arc::new(AtomicBool::new(false)),
            }
        }

        fn last_user_message(&self) -> String {
            let seen = self.seen.lock().unwrap();
            seen.last()
                .and_then(|messages| messages.last())
                .map(|m| m.content.clone())
                .unwrap_or_default()
        }
    }

    struct ReleaseFlag(Arc<AtomicBool>);

    impl Drop for ReleaseFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl GenerationEngine for ScriptedEngine {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _max_tokens: u32,
            _temperature: f32,
        ) -> Result<crate::providers::Completion> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(crate::providers::Completion {
                text: self.answer.clone(),
                usage: TokenUsage::new(10, 5),
            })
        }

        async fn stream(
            &self,
            messages: &[ChatMessage],
            _max_tokens: u32,
            _temperature: f32,
        ) -> Result<crate::providers::FragmentStream> {
            self.seen.lock().unwrap().push(messages.to_vec());

            let mut items: Vec<Result<StreamFragment>> = self
                .fragments
                .iter()
                .map(|f| Ok(StreamFragment::Text(f.clone())))
                .collect();
            if !self.hold_open {
                items.push(Ok(StreamFragment::Done(TokenUsage::new(10, 5))));
            }

            let guard = ReleaseFlag(Arc::clone(&self.stream_released));
            let base = stream::iter(items);
            let stream: crate::providers::FragmentStream = if self.hold_open {
                Box::pin(
                    base.chain(stream::pending())
                        .map(move |item| {
                            let _ = &guard;
                            item
                        }),
                )
            } else {
                Box::pin(base.map(move |item| {
                    let _ = &guard;
                    item
                }))
            };
            Ok(stream)
        }

        fn model(&self) -> &str {
            "stub-model"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn passage(index: u8, score: f32, content: &str) -> RetrievedPassage {
        RetrievedPassage {
            chunk_id: Uuid::from_bytes([index; 16]),
            document_id: Uuid::from_bytes([0xAA; 16]),
            document_title: "Handbook.pdf".to_string(),
            page_number: Some(index as u32),
            content: content.to_string(),
            relevance_score: score,
        }
    }

    fn orchestrator(
        passages: Vec<RetrievedPassage>,
        engine: Arc<ScriptedEngine>,
    ) -> Arc<Orchestrator> {
        let retriever = Arc::new(StubRetriever { passages });
        Arc::new(Orchestrator::new(
            retriever,
            engine,
            &crate::config::RagConfig::default(),
        ))
    }

    #[tokio::test]
    async fn ask_includes_all_fitting_passages_and_estimates_confidence() {
        let engine = Arc::new(ScriptedEngine::new("Grounded [Source 1].", &[]));
        let orchestrator = orchestrator(
            vec![
                passage(1, 0.9, "first passage text"),
                passage(2, 0.82, "second passage text"),
                passage(3, 0.4, "third passage text"),
            ],
            Arc::clone(&engine),
        );

        let answer = orchestrator.ask(&AskRequest::new("what?")).await.unwrap();

        assert_eq!(answer.context_used, 3);
        assert_eq!(answer.confidence, crate::confidence::ConfidenceLevel::High);
        assert_eq!(answer.model, "stub-model");
        let indices: Vec<usize> = answer.citations.iter().map(|c| c.source_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(answer.usage.total_tokens, 15);
    }

    #[tokio::test]
    async fn empty_retrieval_still_generates_with_no_context_instruction() {
        let engine = Arc::new(ScriptedEngine::new(
            "The available documents do not contain this information.",
            &[],
        ));
        let orchestrator = orchestrator(Vec::new(), Arc::clone(&engine));

        let answer = orchestrator.ask(&AskRequest::new("unknown?")).await.unwrap();

        assert_eq!(answer.confidence, crate::confidence::ConfidenceLevel::None);
        assert!(answer.citations.is_empty());
        assert_eq!(answer.context_used, 0);
        assert!(engine
            .last_user_message()
            .contains("No relevant context was found"));
    }

    #[tokio::test]
    async fn dangling_marker_is_stripped_from_atomic_answers() {
        let engine = Arc::new(ScriptedEngine::new("Yes, see [Source 3].", &[]));
        let orchestrator = orchestrator(vec![passage(1, 0.9, "only passage")], engine);

        let answer = orchestrator.ask(&AskRequest::new("q")).await.unwrap();

        assert_eq!(answer.text, "Yes, see .");
        // Citations still cover everything presented to the engine.
        assert_eq!(answer.citations.len(), 1);
    }

    #[tokio::test]
    async fn identical_requests_produce_identical_answers() {
        let engine = Arc::new(ScriptedEngine::new("Stable answer [Source 1].", &[]));
        let orchestrator = orchestrator(vec![passage(1, 0.7, "the passage")], engine);

        let request = AskRequest::new("same question");
        let first = orchestrator.ask(&request).await.unwrap();
        let second = orchestrator.ask(&request).await.unwrap();

        assert_eq!(first.text, second.text);
        assert_eq!(first.confidence, second.confidence);
        assert_eq!(first.context_used, second.context_used);
        assert_eq!(first.citations.len(), second.citations.len());
    }

    #[tokio::test]
    async fn conversation_history_is_merged_in_order() {
        let engine = Arc::new(ScriptedEngine::new("Follow-up answer.", &[]));
        let orchestrator = orchestrator(vec![passage(1, 0.7, "context")], Arc::clone(&engine));

        let history = vec![
            ConversationTurn {
                role: crate::types::conversation::Role::User,
                content: "earlier question".to_string(),
            },
            ConversationTurn {
                role: crate::types::conversation::Role::Assistant,
                content: "earlier answer".to_string(),
            },
        ];
        orchestrator
            .ask_with_history(&AskRequest::new("follow-up"), &history)
            .await
            .unwrap();

        let seen = engine.seen.lock().unwrap();
        let messages = seen.last().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].content, "earlier question");
        assert_eq!(messages[2].content, "earlier answer");
        assert!(messages[3].content.contains("follow-up"));
    }

    #[tokio::test]
    async fn streamed_fragments_concatenate_to_the_atomic_text() {
        let engine = Arc::new(ScriptedEngine::new(
            "Grounded answer [Source 1].",
            &["Grounded ", "answer ", "[Source 1]."],
        ));
        let orchestrator = orchestrator(
            vec![passage(1, 0.9, "the passage")],
            Arc::clone(&engine),
        );

        let atomic = orchestrator.ask(&AskRequest::new("q")).await.unwrap();

        let events: Vec<StreamEvent> = Arc::clone(&orchestrator)
            .ask_stream(AskRequest::new("q"), Vec::new())
            .collect()
            .await;

        assert!(matches!(&events[0], StreamEvent::Sources(sources) if sources.len() == 1));

        let streamed: String = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Answer(fragment) => Some(fragment.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(streamed, atomic.text);

        let terminal_count = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminal_count, 1);
        assert!(events.last().unwrap().is_terminal());
        assert!(matches!(
            events.last().unwrap(),
            StreamEvent::Done(completion) if completion.context_used == 1
        ));
    }

    #[tokio::test]
    async fn stream_error_terminates_with_error_event() {
        let mut engine = ScriptedEngine::new("", &[]);
        engine.hold_open = false;
        let engine = Arc::new(engine);
        // Retrieval failure path: a retriever that errors.
        struct FailingRetriever;
        #[async_trait::async_trait]
        impl Retriever for FailingRetriever {
            async fn search(&self, _q: &str, _k: usize) -> Result<Vec<RetrievedPassage>> {
                Err(Error::retrieval("index offline"))
            }
            async fn document_info(&self, id: Uuid) -> Result<DocumentInfo> {
                Err(Error::DocumentNotFound(id))
            }
            async fn chunks_of(&self, id: Uuid) -> Result<Vec<DocumentChunk>> {
                Err(Error::DocumentNotFound(id))
            }
        }

        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(FailingRetriever),
            engine,
            &crate::config::RagConfig::default(),
        ));

        let events: Vec<StreamEvent> = orchestrator
            .ask_stream(AskRequest::new("q"), Vec::new())
            .collect()
            .await;

        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            StreamEvent::Error(err) if err.kind == "retrieval_error"
        ));
    }

    #[tokio::test]
    async fn disconnect_mid_stream_releases_the_engine_stream() {
        let mut engine = ScriptedEngine::new("", &["one ", "two "]);
        engine.hold_open = true;
        let engine = Arc::new(engine);
        let released = Arc::clone(&engine.stream_released);

        let orchestrator = orchestrator(vec![passage(1, 0.9, "the passage")], engine);
        let mut events = Arc::clone(&orchestrator).ask_stream(AskRequest::new("q"), Vec::new());

        assert!(matches!(
            events.next().await,
            Some(StreamEvent::Sources(_))
        ));
        assert!(matches!(events.next().await, Some(StreamEvent::Answer(_))));
        assert!(matches!(events.next().await, Some(StreamEvent::Answer(_))));

        // Caller walks away; no terminal event was delivered.
        drop(events);

        let wait = tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while !released.load(Ordering::SeqCst) {
                tokio::task::yield_now().await;
            }
        })
        .await;
        assert!(wait.is_ok(), "engine stream was not released after disconnect");
    }

    #[test]
    fn phase_transitions_follow_the_state_machine() {
        use StreamPhase::*;

        assert!(Init.allows(Retrieved));
        assert!(Retrieved.allows(SourcesEmitted));
        assert!(SourcesEmitted.allows(Generating));
        assert!(Generating.allows(Done));
        assert!(Generating.allows(Cancelled));
        assert!(Init.allows(Error));
        assert!(Generating.allows(Error));

        // No phase may be skipped.
        assert!(!Init.allows(SourcesEmitted));
        assert!(!Init.allows(Generating));
        assert!(!Retrieved.allows(Generating));
        assert!(!Retrieved.allows(Done));
        assert!(!SourcesEmitted.allows(Done));

        // Terminal phases allow nothing.
        assert!(!Done.allows(Error));
        assert!(!Error.allows(Done));
        assert!(!Cancelled.allows(Done));
    }
}
