//! LLM collaborator: the chat-completion capability the orchestrator calls
//! for free-text turns.
//!
//! - `ChatCompletion` is the seam the orchestrator depends on.
//! - `OpenAiClient` talks to any OpenAI-compatible `/chat/completions` API.
//! - `MockCompletion` returns scripted replies and records every request,
//!   for tests and offline runs.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use shoply_core::config::LlmConfig;
use shoply_core::{Message, TokenUsage};

use crate::error::ChatError;
use crate::prompt::{PromptTemplate, WireMessage};

/// Longest error body echoed back in an error message.
const MAX_ERROR_BODY_CHARS: usize = 300;

// =============================================================================
// Trait
// =============================================================================

/// Everything the collaborator needs for one free-text turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    /// Prior turns of the session, oldest first. Excludes `user_text`.
    pub history: Vec<Message>,
    pub user_text: String,
}

/// Reply text and token accounting for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

/// A chat-completion backend.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ChatError>;
}

// =============================================================================
// OpenAiClient
// =============================================================================

/// Client for OpenAI-compatible chat-completion APIs.
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    timeout_secs: u64,
}

impl OpenAiClient {
    /// Build a client from configuration and a resolved API key.
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self, ChatError> {
        if !config.verify_tls {
            tracing::warn!("TLS certificate verification is disabled for the LLM endpoint");
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: completions_endpoint(&config.base_url),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_request(
        &self,
        body: &ChatCompletionRequest<'_>,
    ) -> Result<Completion, ChatError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(map_http_error(status, &body_text));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        extract_completion(parsed)
    }

    fn map_transport_error(&self, err: reqwest::Error) -> ChatError {
        if err.is_timeout() {
            ChatError::LlmTimeout(self.timeout_secs)
        } else if err.is_decode() {
            ChatError::LlmResponse(err.to_string())
        } else if err.is_connect() {
            ChatError::LlmTransport(format!("unable to reach {}: {err}", self.endpoint))
        } else {
            ChatError::LlmTransport(err.to_string())
        }
    }
}

#[async_trait]
impl ChatCompletion for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ChatError> {
        let messages = PromptTemplate::chat(request.system_prompt.as_str())
            .render(&request.history, &request.user_text);
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };

        tracing::debug!(
            model = %self.model,
            history_len = request.history.len(),
            "Sending chat completion request"
        );
        let completion = self.send_request(&body).await?;
        tracing::debug!(
            prompt_tokens = completion.usage.prompt_tokens,
            completion_tokens = completion.usage.completion_tokens,
            "Chat completion received"
        );
        Ok(completion)
    }
}

/// `{base_url}/chat/completions`, tolerating stray whitespace and slashes.
fn completions_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim().trim_end_matches('/'))
}

fn map_http_error(status: StatusCode, body: &str) -> ChatError {
    let message = match status.as_u16() {
        401 => "authentication failed, check your API key".to_string(),
        403 => "access forbidden, insufficient permissions".to_string(),
        429 => "rate limit exceeded".to_string(),
        _ => {
            let trimmed: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
            if trimmed.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string()
            } else {
                trimmed
            }
        }
    };
    ChatError::LlmStatus {
        status: status.as_u16(),
        message,
    }
}

fn extract_completion(response: ChatCompletionResponse) -> Result<Completion, ChatError> {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ChatError::LlmResponse("response contained no message content".into()))?;

    Ok(Completion {
        text: text.trim().to_string(),
        usage: response.usage.unwrap_or_default(),
    })
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// =============================================================================
// MockCompletion - scripted replies for testing
// =============================================================================

/// Scripted collaborator.
///
/// Replies are served in the order they were queued. Once the queue is
/// empty every call echoes the user text with zero usage. All requests are
/// recorded for inspection.
#[derive(Debug, Default)]
pub struct MockCompletion {
    replies: Mutex<VecDeque<Result<Completion, ChatError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn push_reply(&self, text: impl Into<String>, usage: TokenUsage) {
        self.lock_replies().push_back(Ok(Completion {
            text: text.into(),
            usage,
        }));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: ChatError) {
        self.lock_replies().push_back(Err(error));
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn lock_replies(&self) -> MutexGuard<'_, VecDeque<Result<Completion, ChatError>>> {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ChatCompletion for MockCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ChatError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let next = self.lock_replies().pop_front();
        next.unwrap_or_else(|| {
            Ok(Completion {
                text: format!("echo: {}", request.user_text),
                usage: TokenUsage::ZERO,
            })
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
