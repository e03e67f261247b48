//! OpenAI provider implementation
//!
//! This module implements the LLMProvider trait for OpenAI's chat completions
//! endpoint, including token streaming over server-sent events.
//! See: https://platform.openai.com/docs/api-reference/chat
//!
//! # Examples
//!
//! ## Basic usage with environment variable
//!
//! ```no_run
//! use debate_llm::{CompletionRequest, Message, LLMProvider};
//! use debate_llm::providers::OpenAIProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create provider from OPENAI_API_KEY environment variable
//!     let provider = OpenAIProvider::from_env()?;
//!
//!     let request = CompletionRequest::builder("gpt-4o")
//!         .add_message(Message::user("Hello!"))
//!         .max_tokens(100)
//!         .build();
//!
//!     let response = provider.complete(request).await?;
//!     println!("{}", response.text());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming
//!
//! ```no_run
//! use debate_llm::{CompletionRequest, LLMProvider, Message, collect_stream};
//! use debate_llm::providers::OpenAIProvider;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = OpenAIProvider::from_env()?;
//! let request = CompletionRequest::builder("gpt-4o")
//!     .add_message(Message::user("Hello!"))
//!     .build();
//!
//! let stream = provider.complete_stream(request).await?;
//! let text = collect_stream(stream, |fragment| print!("{fragment}")).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Using with OpenAI-compatible APIs
//!
//! ```no_run
//! use debate_llm::providers::{OpenAIProvider, OpenAIConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // For local LLM deployments (e.g., llama.cpp, vLLM, LM Studio)
//! let local_config = OpenAIConfig::new("not-needed")
//!     .with_api_base("http://localhost:1234/v1");
//!
//! let provider = OpenAIProvider::with_config(local_config)?;
//! # Ok(())
//! # }
//! ```

use crate::{
    CompletionRequest, CompletionResponse, CompletionStream, LLMError, LLMProvider, Message,
    Result, StopReason, TokenUsage,
};
use async_trait::async_trait;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::{Stream, StreamExt, future};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const STREAM_DONE: &str = "[DONE]";

/// Configuration for OpenAI provider
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base URL for the OpenAI API (default: "https://api.openai.com/v1")
    /// Can be customized for OpenAI-compatible APIs like Azure OpenAI, local deployments, etc.
    pub api_base: String,

    /// HTTP timeout in seconds for a whole request, body included (default: 120)
    pub timeout_secs: u64,

    /// Optional list of supported models
    /// If None, any model string is accepted
    pub supported_models: Option<Vec<String>>,
}

impl OpenAIConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            supported_models: None,
        }
    }

    /// Create config from environment variable
    ///
    /// Reads the API key from `OPENAI_API_KEY` environment variable.
    /// Optionally reads base URL from `OPENAI_API_BASE` if set.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                LLMError::ConfigurationError(
                    "OPENAI_API_KEY environment variable not set".to_string(),
                )
            })?;

        let api_base = std::env::var("OPENAI_API_BASE")
            .unwrap_or_else(|_| DEFAULT_OPENAI_API_BASE.to_string());

        Ok(Self {
            api_key,
            api_base,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            supported_models: None,
        })
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set supported models list
    ///
    /// When set, the provider will validate model names against this list.
    pub fn with_supported_models(mut self, models: Vec<String>) -> Self {
        self.supported_models = Some(models);
        self
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}

/// OpenAI provider
///
/// Works with GPT models (gpt-4o, gpt-4o-mini, ...) and any server exposing
/// the OpenAI chat completions API.
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with custom configuration
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a new OpenAI provider with API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(OpenAIConfig::new(api_key))
    }

    /// Create a provider from environment variables
    ///
    /// Reads the API key from the `OPENAI_API_KEY` environment variable.
    /// Optionally reads base URL from `OPENAI_API_BASE` if set.
    pub fn from_env() -> Result<Self> {
        let config = OpenAIConfig::from_env()?;
        Self::with_config(config)
    }

    /// Get the current configuration
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// Validate model name against supported models list (if configured)
    fn validate_model(&self, model: &str) -> Result<()> {
        if let Some(supported) = &self.config.supported_models {
            if !supported.iter().any(|m| m == model) {
                return Err(LLMError::InvalidRequest(format!(
                    "Model '{model}' is not in the supported models list: {supported:?}"
                )));
            }
        }
        Ok(())
    }

    /// POST the request and turn non-2xx statuses into typed errors
    async fn send(&self, request: &OpenAIRequest) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, error_text, &request.model));
        }

        Ok(response)
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    #[instrument(skip(self, request), fields(model = %request.model, api_base = %self.config.api_base))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!("Sending request to OpenAI API at {}", self.config.api_base);
        self.validate_model(&request.model)?;

        let openai_request = OpenAIRequest::from_completion(request, false);
        let response = self.send(&openai_request).await?;

        let openai_response: OpenAIResponse = response.json().await.map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        // OpenAI can return multiple choices but we only ever ask for one
        let choice = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::UnexpectedResponse("No choices in response".to_string()))?;

        let usage = openai_response.usage.unwrap_or_default();
        debug!(
            "Received response - stop_reason: {}, tokens: {}/{}",
            choice.finish_reason.as_deref().unwrap_or("none"),
            usage.prompt_tokens,
            usage.completion_tokens
        );

        Ok(CompletionResponse {
            message: Message::assistant(choice.message.content.unwrap_or_default()),
            stop_reason: map_stop_reason(choice.finish_reason.as_deref().unwrap_or("stop")),
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        })
    }

    #[instrument(skip(self, request), fields(model = %request.model, api_base = %self.config.api_base))]
    async fn complete_stream(&self, request: CompletionRequest) -> Result<CompletionStream> {
        debug!("Opening streaming request to OpenAI API");
        self.validate_model(&request.model)?;

        let openai_request = OpenAIRequest::from_completion(request, true);
        let response = self.send(&openai_request).await?;

        let bytes: ByteStream = Box::pin(response.bytes_stream().map(|r| r.map(|b| b.to_vec())));
        Ok(fragment_stream(bytes))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Vec<u8>>> + Send>>;

/// Turn a raw SSE body into an ordered stream of text fragments
///
/// Ends at the `[DONE]` sentinel or the end of the body. An error is always
/// the last item.
fn fragment_stream(bytes: ByteStream) -> CompletionStream {
    let fragments = bytes
        .eventsource()
        .take_while(|event| {
            future::ready(!matches!(event, Ok(event) if event.data.trim() == STREAM_DONE))
        })
        .filter_map(|event| {
            future::ready(match event {
                Ok(event) if event.data.trim().is_empty() => None,
                Ok(event) => parse_stream_chunk(&event.data).transpose(),
                Err(EventStreamError::Transport(e)) => Some(Err(LLMError::HttpError(e))),
                Err(e) => Some(Err(LLMError::StreamError(format!("Malformed event stream: {e}")))),
            })
        })
        .scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            *failed = item.is_err();
            future::ready(Some(item))
        });

    Box::pin(fragments)
}

// ============================================================================
// OpenAI-specific request/response types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

impl OpenAIRequest {
    fn from_completion(request: CompletionRequest, stream: bool) -> Self {
        Self {
            model: request.model,
            messages: build_openai_messages(request.system, request.messages),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream,
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamErrorBody {
    message: String,
}

// ============================================================================
// Conversion functions
// ============================================================================

/// Build OpenAI messages from our generic format
///
/// The system prompt goes first in the messages array.
fn build_openai_messages(system: Option<String>, messages: Vec<Message>) -> Vec<OpenAIMessage> {
    system
        .map(|content| OpenAIMessage {
            role: "system",
            content,
        })
        .into_iter()
        .chain(messages.into_iter().map(|m| OpenAIMessage {
            role: m.role.as_str(),
            content: m.content,
        }))
        .collect()
}

/// Extract the text delta of one streamed chunk
fn parse_stream_chunk(data: &str) -> Result<Option<String>> {
    let chunk: StreamChunk = serde_json::from_str(data).map_err(|e| {
        LLMError::UnexpectedResponse(format!("Failed to parse stream chunk: {e}"))
    })?;

    if let Some(error) = chunk.error {
        return Err(LLMError::StreamError(error.message));
    }

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|s| !s.is_empty()))
}

fn map_status_error(status: StatusCode, error_text: String, model: &str) -> LLMError {
    match status.as_u16() {
        401 | 403 => LLMError::AuthenticationFailed,
        429 => LLMError::RateLimitExceeded(error_text),
        400 => LLMError::InvalidRequest(error_text),
        404 => LLMError::ModelNotFound(model.to_string()),
        _ => LLMError::RequestFailed(format!("HTTP {status}: {error_text}")),
    }
}

/// Map OpenAI stop reason to our format
fn map_stop_reason(reason: &str) -> StopReason {
    match reason {
        "stop" => StopReason::EndTurn,
        "length" => StopReason::MaxTokens,
        "content_filter" => {
            debug!("Content filtered by OpenAI safety systems");
            StopReason::ContentFilter
        }
        _ => {
            debug!("Unknown stop reason: {}", reason);
            StopReason::EndTurn
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn byte_stream(chunks: Vec<&'static str>) -> ByteStream {
        Box::pin(futures::stream::iter(
            chunks.into_iter().map(|c| Ok(c.as_bytes().to_vec())),
        ))
    }

    async fn drain(stream: CompletionStream) -> Vec<Result<String>> {
        stream.collect().await
    }

    #[test]
    fn test_provider_creation() {
        let provider = OpenAIProvider::new("test-key").unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.config().api_key, "test-key");
        assert_eq!(provider.config().api_base, "https://api.openai.com/v1");
    }

    #[test]
    fn test_provider_with_custom_config() {
        let config = OpenAIConfig::new("test-key")
            .with_api_base("http://localhost:1234/v1")
            .with_timeout(60)
            .with_supported_models(vec!["gpt-4o".to_string()]);

        let provider = OpenAIProvider::with_config(config).unwrap();
        assert_eq!(provider.config().api_base, "http://localhost:1234/v1");
        assert_eq!(provider.config().timeout_secs, 60);
        assert!(provider.validate_model("gpt-4o").is_ok());
        assert!(matches!(
            provider.validate_model("gpt-3.5-turbo"),
            Err(LLMError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_from_env_without_key() {
        unsafe {
            std::env::remove_var("OPENAI_API_KEY");
        }
        let result = OpenAIProvider::from_env();
        assert!(matches!(result, Err(LLMError::ConfigurationError(_))));
    }

    #[test]
    fn test_system_message_first() {
        let messages = build_openai_messages(
            Some("You are helpful".to_string()),
            vec![Message::user("Hi")],
        );

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, "You are helpful");
        assert_eq!(messages[1].role, "user");
    }

    #[test]
    fn test_stream_flag_only_serialized_when_set() {
        let request = CompletionRequest::builder("gpt-4o")
            .add_message(Message::user("Hi"))
            .build();

        let blocking = serde_json::to_value(OpenAIRequest::from_completion(request.clone(), false))
            .unwrap();
        assert!(blocking.get("stream").is_none());

        let streaming =
            serde_json::to_value(OpenAIRequest::from_completion(request, true)).unwrap();
        assert_eq!(streaming["stream"], serde_json::json!(true));
    }

    #[test]
    fn test_parse_stream_chunk() {
        let data = r#"{"choices":[{"index":0,"delta":{"content":"Hel"}}]}"#;
        assert_eq!(parse_stream_chunk(data).unwrap(), Some("Hel".to_string()));

        let role_only = r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_stream_chunk(role_only).unwrap(), None);

        let error = r#"{"error":{"message":"overloaded"}}"#;
        assert!(matches!(
            parse_stream_chunk(error),
            Err(LLMError::StreamError(msg)) if msg == "overloaded"
        ));
    }

    #[tokio::test]
    async fn test_fragment_stream_orders_and_stops_at_done() {
        let bytes = byte_stream(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"Strong \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"con",
            "tent\":\"margins\"}}]}\n\ndata: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        ]);

        let fragments: Vec<String> = drain(fragment_stream(bytes))
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(fragments, vec!["Strong ".to_string(), "margins".to_string()]);
    }

    #[tokio::test]
    async fn test_fragment_stream_surfaces_errors() {
        let bytes = byte_stream(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n",
            "data: not-json\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\n",
        ]);

        let items = drain(fragment_stream(bytes)).await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(LLMError::UnexpectedResponse(_))));
    }

    #[tokio::test]
    async fn test_fragment_stream_without_done_sentinel() {
        let bytes = byte_stream(vec!["data: {\"choices\":[{\"delta\":{\"content\":\"end\"}}]}\n\n"]);
        let items = drain(fragment_stream(bytes)).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), "end");
    }

    #[tokio::test]
    async fn test_fragment_stream_joins_multiline_data() {
        let bytes = byte_stream(vec![
            "data: {\"choices\":[{\"delta\":\ndata: {\"content\":\"Hi\"}}]}\n\n",
            "data: [DONE]\n\n",
        ]);

        let items = drain(fragment_stream(bytes)).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), "Hi");
    }

    #[tokio::test]
    async fn test_fragment_stream_skips_other_fields() {
        let bytes = byte_stream(vec![
            ": keep-alive\n\n",
            "event: message\nid: 1\ndata: {\"choices\":[{\"delta\":{\"content\":\"Debt \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"is low\"}}]}\r\nid: 2\r\nretry: 3000\r\n\r\n",
            "event: ping\n\n",
            "data: [DONE]\n\n",
        ]);

        let fragments: Vec<String> = drain(fragment_stream(bytes))
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(fragments, vec!["Debt ".to_string(), "is low".to_string()]);
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            map_status_error(StatusCode::UNAUTHORIZED, String::new(), "m"),
            LLMError::AuthenticationFailed
        ));
        assert!(matches!(
            map_status_error(StatusCode::TOO_MANY_REQUESTS, "slow".into(), "m"),
            LLMError::RateLimitExceeded(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::NOT_FOUND, String::new(), "gpt-x"),
            LLMError::ModelNotFound(m) if m == "gpt-x"
        ));
    }

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(map_stop_reason("stop"), StopReason::EndTurn);
        assert_eq!(map_stop_reason("length"), StopReason::MaxTokens);
        assert_eq!(map_stop_reason("content_filter"), StopReason::ContentFilter);
        assert_eq!(map_stop_reason("unknown"), StopReason::EndTurn);
    }
}
