//! Bull vs. bear stock debate engine
//!
//! Two analyst personas argue for and against buying a stock over a fixed
//! number of rounds, grounded in shared research, and a final recommendation
//! is synthesized from the transcript:
//!
//! - Research gathering from Yahoo Finance, Alpha Vantage and Tavily, cached per ticker
//! - Per-turn prompt assembly that only quotes the opponent's latest argument
//! - A turn-taking loop with timeouts, cancellation and streamed output
//! - Verdicts from a judge model or a keyword heuristic
//! - Company name to ticker resolution
//!
//! # Example
//!
//! ```rust,ignore
//! use debate_llm::providers::OpenAIProvider;
//! use stock_debate::{DebateConfig, StockDebateSystem};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let provider = Arc::new(OpenAIProvider::from_env()?);
//!     let config = DebateConfig::builder().with_env_keys().rounds(2).build()?;
//!
//!     let system = StockDebateSystem::new(provider, config)?;
//!     let report = system.analyze("AAPL", None).await;
//!     println!("{}", report.result.conclusion);
//!
//!     Ok(())
//! }
//! ```

pub mod agents;
pub mod api;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod prompts;
pub mod research;
pub mod system;

#[cfg(test)]
mod test_support;

pub use agents::{Persona, PersonaId, SymbolResolver};
pub use config::{DebateConfig, DebateConfigBuilder, FailurePolicy, VerdictStrategy};
pub use engine::{
    ChannelSink, DebateOrchestrator, DebateResult, Recommendation, StreamEvent, StreamSink,
    Transcript, Turn, Verdict,
};
pub use error::{DebateError, Result};
pub use research::{NewsItem, ResearchContext, ResearchService, StockMetrics};
pub use system::{AnalysisReport, StockDebateSystem};
