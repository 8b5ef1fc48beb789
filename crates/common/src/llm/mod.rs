//! Chat model client abstraction
//!
//! The ranking core never talks to a model directly. Anything that needs a
//! completion receives an `Arc<dyn ChatClient>` from its constructor, so tests
//! can substitute the scripted [`MockChatClient`].

mod summarizer;

pub use summarizer::{Summarizer, SummaryStyle};

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A text-in, text-out chat model
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a single user prompt and return the model's reply
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logs
    fn model_name(&self) -> &str;
}

/// OpenAI-compatible chat completions client
pub struct OpenAIChatClient {
    config: LlmConfig,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl OpenAIChatClient {
    /// Create a new client; fails when no API key is configured
    pub fn new(config: LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "llm.api_key is not set".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { config, api_key, client })
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let start = Instant::now();

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self.client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::LlmTimeout {
                        timeout_ms: start.elapsed().as_millis() as u64,
                    }
                } else {
                    AppError::LlmError {
                        message: format!("LLM API request failed: {}", e),
                    }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::LlmError {
                message: format!("LLM API error {}: {}", status, body),
            });
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| AppError::LlmError {
            message: format!("Failed to parse LLM response: {}", e),
        })?;

        tracing::debug!(
            model = %self.config.model,
            latency_ms = start.elapsed().as_millis() as u64,
            "LLM completion received"
        );

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::LlmError {
                message: "Empty response from LLM".to_string(),
            })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Create the configured chat client, or `None` when no key is set
pub fn create_chat_client(config: &LlmConfig) -> Result<Option<Arc<dyn ChatClient>>> {
    match config.api_key.as_deref() {
        Some(key) if !key.is_empty() => {
            let client: Arc<dyn ChatClient> = Arc::new(OpenAIChatClient::new(config.clone())?);
            Ok(Some(client))
        }
        _ => Ok(None),
    }
}

/// Scripted chat client for tests.
///
/// Replies are served in order; once the script runs out every call fails.
#[derive(Default)]
pub struct MockChatClient {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queue a failing call
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(Err(message.into()));
        self
    }

    fn push(&self, reply: std::result::Result<String, String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    /// Number of `complete` calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let next = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(AppError::LlmError { message }),
            None => Err(AppError::LlmError {
                message: "mock script exhausted".to_string(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_serves_script_in_order() {
        let client = MockChatClient::new().reply("first").fail("down").reply("third");

        assert_eq!(client.complete("a").await.unwrap(), "first");
        assert!(client.complete("b").await.is_err());
        assert_eq!(client.complete("c").await.unwrap(), "third");
        assert!(client.complete("d").await.is_err());
        assert_eq!(client.calls(), 4);
        assert_eq!(client.prompts(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_no_client_without_key() {
        let config = LlmConfig::default();
        assert!(create_chat_client(&config).unwrap().is_none());
        assert!(OpenAIChatClient::new(config).is_err());
    }

    #[test]
    fn test_client_with_key() {
        let config = LlmConfig {
            api_key: Some("sk-test".to_string()),
            ..LlmConfig::default()
        };
        let client = create_chat_client(&config).unwrap().unwrap();
        assert_eq!(client.model_name(), "gpt-4o-mini");
    }
}
