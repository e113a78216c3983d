//! OpenAI-compatible completion client for Parlance
//!
//! This module implements the CompletionClient trait against an
//! OpenAI-compatible `/chat/completions` endpoint. The API base is
//! configurable so tests can point the client at a mock server.

use crate::config::OpenAiConfig;
use crate::error::{ParlanceError, Result};
use crate::providers::{CompletionClient, CompletionResponse, Message, TokenUsage};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default API base when none is configured
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat-completions client
///
/// Generation parameters are fixed: one completion (`n = 1`) with
/// deterministic sampling (`temperature = 0`). The request is a blocking
/// network call from the session's point of view; there is no internal
/// timeout beyond the HTTP client's and no retry.
///
/// # Examples
///
/// ```no_run
/// use parlance::config::OpenAiConfig;
/// use parlance::providers::{CompletionClient, Message, OpenAiClient};
///
/// # async fn example() -> parlance::error::Result<()> {
/// let config = OpenAiConfig::default();
/// let client = OpenAiClient::new(config)?;
/// let reply = client.complete(&[Message::user("Hello!")]).await?;
/// println!("{}", reply.content);
/// # Ok(())
/// # }
/// ```
pub struct OpenAiClient {
    http: Client,
    api_base: String,
    model: String,
    api_key: Option<String>,
}

/// Request body for the chat-completions endpoint
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    n: u8,
    temperature: f32,
}

/// Response body from the chat-completions endpoint
///
/// The service signals failures in-band with an `error` object instead of
/// a useful status code in some deployments, so both shapes are handled.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    error_type: String,
}

impl OpenAiClient {
    /// Create a new client from configuration
    ///
    /// The API key is read from the environment variable named in the
    /// configuration. A missing key is tolerated at construction time so
    /// that local and mock endpoints work without credentials; the remote
    /// service will reject unauthenticated calls on its own.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent("parlance/0.2.0")
            .build()
            .map_err(|e| ParlanceError::Client(format!("Failed to create HTTP client: {}", e)))?;

        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.is_none() {
            tracing::warn!(
                "No API key found in {}; requests will be unauthenticated",
                config.api_key_env
            );
        }

        let api_base = config
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        tracing::info!(
            "Initialized OpenAI client: api_base={}, model={}",
            api_base,
            config.model
        );

        Ok(Self {
            http,
            api_base,
            model: config.model,
            api_key,
        })
    }

    /// The configured model name
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            n: 1,
            temperature: 0.0,
        };

        tracing::debug!(
            "Requesting completion: url={}, messages={}",
            url,
            messages.len()
        );

        let mut request = self.http.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!("Completion request failed: {}", e);
            ParlanceError::Client(format!("Failed to reach completion service: {}", e))
        })?;

        let status = response.status();
        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
            ParlanceError::Client(format!(
                "Failed to parse completion response (status {}): {}",
                status, e
            ))
        })?;

        if let Some(error) = parsed.error {
            tracing::error!(
                "Completion service returned error: type={}, message={}",
                error.error_type,
                error.message
            );
            return Err(ParlanceError::Client(format!(
                "Service error: {}",
                error.message
            ))
            .into());
        }

        if !status.is_success() {
            return Err(
                ParlanceError::Client(format!("Completion service returned {}", status)).into(),
            );
        }

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                ParlanceError::Client("Completion response contained no choices".to_string())
            })?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        tracing::debug!(
            "Completion received: {} chars, {} total tokens",
            content.len(),
            usage.total_tokens
        );

        Ok(CompletionResponse { content, usage })
    }

    fn name(&self) -> &str {
        "openai"
    }
}
