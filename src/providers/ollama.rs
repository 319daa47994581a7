//! Ollama generation engine via `/api/chat`

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::types::conversation::ChatMessage;
use crate::types::response::TokenUsage;

use super::llm::{Completion, FragmentStream, GenerationEngine, StreamFragment};

/// Generation engine backed by a local Ollama server
pub struct OllamaEngine {
    client: Client,
    base_url: String,
    model: String,
    request_timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: i64,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// One NDJSON line of a streamed chat response
#[derive(Deserialize)]
struct ChatStreamChunk {
    #[serde(default)]
    message: Option<ChatResponseMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

impl OllamaEngine {
    /// Create a new engine from configuration
    ///
    /// The client carries a connect timeout and an inactivity timeout
    /// between body chunks; the total bound for atomic calls is applied
    /// per request so long streams are not cut off mid-answer.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(Duration::from_secs(config.stream_idle_timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            request_timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

#[async_trait::async_trait]
impl GenerationEngine for OllamaEngine {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<Completion> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature,
                num_predict: max_tokens as i64,
            },
        };

        tracing::debug!(model = %self.model, messages = messages.len(), "generation call");

        let fut = async {
            let response = self
                .client
                .post(self.chat_url())
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::generation(format!("request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::generation(format!("HTTP {} - {}", status, body)));
            }

            let chat: ChatResponse = response
                .json()
                .await
                .map_err(|e| Error::generation(format!("malformed response: {}", e)))?;

            Ok(Completion {
                text: chat.message.content,
                usage: TokenUsage::new(
                    chat.prompt_eval_count.unwrap_or(0),
                    chat.eval_count.unwrap_or(0),
                ),
            })
        };

        tokio::time::timeout(self.request_timeout, fut)
            .await
            .map_err(|_| Error::generation("request timed out"))?
    }

    async fn stream(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<FragmentStream> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: true,
            options: ChatOptions {
                temperature,
                num_predict: max_tokens as i64,
            },
        };

        tracing::debug!(model = %self.model, messages = messages.len(), "streaming generation call");

        let response = self
            .client
            .post(self.chat_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::generation(format!("stream request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::generation(format!("HTTP {} - {}", status, body)));
        }

        // NDJSON decode with a carry buffer for lines split across chunks.
        // The stream ends after the `done: true` line; dropping it drops the
        // response body and with it the connection.
        let stream = response
            .bytes_stream()
            .map(|item| item.map_err(|e| Error::generation(format!("stream read failed: {}", e))))
            .scan((String::new(), false), |(buffer, finished), item| {
                if *finished {
                    return futures_util::future::ready(None);
                }
                let out: Vec<Result<StreamFragment>> = match item {
                    Err(e) => {
                        *finished = true;
                        vec![Err(e)]
                    }
                    Ok(bytes) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                        match decode_lines(buffer, finished) {
                            Ok(fragments) => fragments.into_iter().map(Ok).collect(),
                            Err(e) => {
                                *finished = true;
                                vec![Err(e)]
                            }
                        }
                    }
                };
                futures_util::future::ready(Some(out))
            })
            .flat_map(futures_util::stream::iter);

        Ok(Box::pin(stream))
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

/// Decode the complete NDJSON lines currently in the buffer
fn decode_lines(buffer: &mut String, finished: &mut bool) -> Result<Vec<StreamFragment>> {
    let mut fragments = Vec::new();

    while let Some(pos) = buffer.find('\n') {
        let line: String = buffer.drain(..=pos).collect();
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let chunk: ChatStreamChunk = serde_json::from_str(line)
            .map_err(|e| Error::generation(format!("malformed stream line: {}", e)))?;

        if let Some(message) = chunk.error {
            return Err(Error::generation(message));
        }

        if let Some(message) = chunk.message {
            if !message.content.is_empty() {
                fragments.push(StreamFragment::Text(message.content));
            }
        }

        if chunk.done {
            fragments.push(StreamFragment::Done(TokenUsage::new(
                chunk.prompt_eval_count.unwrap_or(0),
                chunk.eval_count.unwrap_or(0),
            )));
            *finished = true;
            break;
        }
    }

    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_handles_split_lines() {
        let mut buffer = String::from(r#"{"message":{"content":"Hel"#);
        let mut finished = false;

        // No complete line yet.
        let fragments = decode_lines(&mut buffer, &mut finished).unwrap();
        assert!(fragments.is_empty());

        buffer.push_str("lo\"},\"done\":false}\n");
        let fragments = decode_lines(&mut buffer, &mut finished).unwrap();
        assert_eq!(fragments.len(), 1);
        assert!(matches!(&fragments[0], StreamFragment::Text(t) if t == "Hello"));
        assert!(!finished);
    }

    #[test]
    fn decode_emits_done_with_usage() {
        let mut buffer = String::from(
            "{\"message\":{\"content\":\"x\"},\"done\":false}\n{\"done\":true,\"prompt_eval_count\":12,\"eval_count\":34}\n",
        );
        let mut finished = false;

        let fragments = decode_lines(&mut buffer, &mut finished).unwrap();
        assert_eq!(fragments.len(), 2);
        assert!(matches!(
            &fragments[1],
            StreamFragment::Done(usage) if usage.prompt_tokens == 12 && usage.completion_tokens == 34
        ));
        assert!(finished);
    }

    #[test]
    fn decode_surfaces_engine_errors() {
        let mut buffer = String::from("{\"error\":\"model not found\"}\n");
        let mut finished = false;

        let err = decode_lines(&mut buffer, &mut finished).unwrap_err();
        assert!(err.to_string().contains("model not found"));
    }

    #[test]
    fn decode_rejects_malformed_lines() {
        let mut buffer = String::from("not json\n");
        let mut finished = false;

        assert!(decode_lines(&mut buffer, &mut finished).is_err());
    }
}
