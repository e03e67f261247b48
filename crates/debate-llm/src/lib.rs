//! Completion client adapter for stock-debate
//!
//! This crate provides provider-agnostic abstractions for requesting text from
//! Large Language Models. It includes:
//!
//! - Message types for chat-style requests
//! - Completion request/response types
//! - The [`LLMProvider`] trait, with a single-shot and a token-streamed call
//! - An OpenAI-compatible provider (behind the default `openai` feature)

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::{CompletionStream, LLMProvider, collect_stream};

// Provider implementations (feature-gated)
#[cfg(feature = "openai")]
pub mod providers;
