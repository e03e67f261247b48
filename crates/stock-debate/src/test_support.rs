//! Scripted completion provider for tests

use async_trait::async_trait;
use debate_llm::{
    CompletionRequest, CompletionResponse, CompletionStream, LLMError, LLMProvider, Message,
    StopReason, TokenUsage,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Step {
    Reply(String),
    Fail(String),
    Slow(Duration, String),
    BrokenStream(String, String),
}

#[derive(Default)]
struct Script {
    steps: VecDeque<Step>,
    fallback: Option<String>,
    requests: Vec<CompletionRequest>,
}

/// Provider that plays back a fixed sequence of replies and failures
///
/// Clones share the script and the request log.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    script: Arc<Mutex<Script>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, step: Step) -> Self {
        self.script.lock().unwrap().steps.push_back(step);
        self
    }

    /// Next call succeeds with `text`
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Step::Reply(text.into()))
    }

    /// Next call fails with a provider error
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(Step::Fail(message.into()))
    }

    /// Next call answers only after `delay`
    pub fn slow(self, delay: Duration, text: impl Into<String>) -> Self {
        self.push(Step::Slow(delay, text.into()))
    }

    /// Next streamed call yields `partial` and then errors
    pub fn broken_stream(self, partial: impl Into<String>, message: impl Into<String>) -> Self {
        self.push(Step::BrokenStream(partial.into(), message.into()))
    }

    /// Reply used once the script runs out
    pub fn otherwise(self, text: impl Into<String>) -> Self {
        self.script.lock().unwrap().fallback = Some(text.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.script.lock().unwrap().requests.len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.script.lock().unwrap().requests.clone()
    }

    fn next_step(&self, request: CompletionRequest) -> Step {
        let mut script = self.script.lock().unwrap();
        script.requests.push(request);
        match script.steps.pop_front() {
            Some(step) => step,
            None => match &script.fallback {
                Some(text) => Step::Reply(text.clone()),
                None => Step::Fail("script exhausted".to_string()),
            },
        }
    }
}

fn response(text: String) -> CompletionResponse {
    CompletionResponse {
        message: Message::assistant(text),
        stop_reason: StopReason::EndTurn,
        usage: TokenUsage::default(),
    }
}

/// Split text into word-sized fragments that concatenate back to the original
fn fragments(text: &str) -> Vec<String> {
    text.split_inclusive(' ').map(str::to_string).collect()
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> debate_llm::Result<CompletionResponse> {
        match self.next_step(request) {
            Step::Reply(text) => Ok(response(text)),
            Step::Fail(message) | Step::BrokenStream(_, message) => {
                Err(LLMError::ProviderError(message))
            }
            Step::Slow(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(response(text))
            }
        }
    }

    async fn complete_stream(&self, request: CompletionRequest) -> debate_llm::Result<CompletionStream> {
        let items: Vec<debate_llm::Result<String>> = match self.next_step(request) {
            Step::Reply(text) => fragments(&text).into_iter().map(Ok).collect(),
            Step::Fail(message) => return Err(LLMError::ProviderError(message)),
            Step::Slow(delay, text) => {
                tokio::time::sleep(delay).await;
                fragments(&text).into_iter().map(Ok).collect()
            }
            Step::BrokenStream(partial, message) => {
                let mut items: Vec<_> = fragments(&partial).into_iter().map(Ok).collect();
                items.push(Err(LLMError::StreamError(message)));
                items
            }
        };
        Ok(Box::pin(futures::stream::iter(items)))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
