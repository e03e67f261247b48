//! LLM provider trait definition

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;

/// Ordered stream of text fragments for one completion
///
/// Fragments arrive in generation order; the stream ends after the final
/// fragment, or yields an error and then ends.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Trait for LLM providers
///
/// Implementations of this trait provide access to different LLM services
/// (e.g., OpenAI or any OpenAI-compatible server).
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion from the LLM
    ///
    /// # Arguments
    ///
    /// * `request` - The completion request with messages and parameters
    ///
    /// # Returns
    ///
    /// The completion response with the assistant's message and metadata
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Generate a completion as a stream of text fragments
    ///
    /// Providers without native streaming get the degenerate case: the whole
    /// response delivered as a single fragment.
    async fn complete_stream(&self, request: CompletionRequest) -> Result<CompletionStream> {
        let response = self.complete(request).await?;
        let text = response.message.content;
        Ok(Box::pin(futures::stream::once(async move { Ok(text) })))
    }

    /// Get the provider name (e.g., "openai")
    fn name(&self) -> &str;
}

/// Drain a completion stream, handing every fragment to `on_fragment` in order
///
/// Returns the concatenated text. Stops at the first error.
pub async fn collect_stream<F>(mut stream: CompletionStream, mut on_fragment: F) -> Result<String>
where
    F: FnMut(&str),
{
    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        if fragment.is_empty() {
            continue;
        }
        on_fragment(&fragment);
        text.push_str(&fragment);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LLMError, Message, StopReason, TokenUsage};

    struct EchoProvider;

    #[async_trait]
    impl LLMProvider for EchoProvider {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
            let text = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(CompletionResponse {
                message: Message::assistant(text),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_default_stream_is_single_fragment() {
        let request = CompletionRequest::builder("m")
            .add_message(Message::user("whole text"))
            .build();
        let stream = EchoProvider.complete_stream(request).await.unwrap();

        let mut fragments = Vec::new();
        let text = collect_stream(stream, |f| fragments.push(f.to_string()))
            .await
            .unwrap();

        assert_eq!(text, "whole text");
        assert_eq!(fragments, vec!["whole text".to_string()]);
    }

    #[tokio::test]
    async fn test_collect_stream_stops_on_error() {
        let stream: CompletionStream = Box::pin(futures::stream::iter(vec![
            Ok("a".to_string()),
            Err(LLMError::StreamError("cut".to_string())),
            Ok("b".to_string()),
        ]));

        let mut seen = Vec::new();
        let result = collect_stream(stream, |f| seen.push(f.to_string())).await;

        tokio_test::assert_err!(result);
        assert_eq!(seen, vec!["a".to_string()]);
    }
}
