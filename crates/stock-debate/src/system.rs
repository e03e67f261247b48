//! Research and debate in one call

use crate::agents::SymbolResolver;
use crate::config::DebateConfig;
use crate::engine::{ChatMessage, DebateOrchestrator, DebateResult, StreamSink};
use crate::error::Result;
use crate::research::{ResearchContext, ResearchService};
use debate_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Research that fed a debate together with its outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// `None` when research failed and no debate took place
    pub research: Option<ResearchContext>,
    pub result: DebateResult,
    /// Transcript as `{role, content}` pairs for chat-style consumers
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl AnalysisReport {
    pub fn new(research: Option<ResearchContext>, result: DebateResult) -> Self {
        let messages = result.messages();
        Self {
            research,
            result,
            messages,
        }
    }
}

/// Entry point wiring research, the debate loop and symbol lookup together
pub struct StockDebateSystem {
    research: ResearchService,
    orchestrator: DebateOrchestrator,
    resolver: SymbolResolver,
}

impl StockDebateSystem {
    /// Build the network-backed system described by `config`
    pub fn new(provider: Arc<dyn LLMProvider>, config: DebateConfig) -> Result<Self> {
        let research = ResearchService::from_config(&config)?;
        Self::with_research(provider, config, research)
    }

    /// Build a system around an existing research service
    pub fn with_research(
        provider: Arc<dyn LLMProvider>,
        config: DebateConfig,
        research: ResearchService,
    ) -> Result<Self> {
        let resolver = SymbolResolver::new(
            Arc::clone(&provider),
            config.model.clone(),
            config.turn_timeout,
        )?;
        let orchestrator = DebateOrchestrator::new(provider, config)?;

        Ok(Self {
            research,
            orchestrator,
            resolver,
        })
    }

    pub fn config(&self) -> &DebateConfig {
        self.orchestrator.config()
    }

    pub fn research(&self) -> &ResearchService {
        &self.research
    }

    /// Map a company name to a ticker, `None` when unknown
    pub async fn resolve_symbol(&self, company: &str, country: Option<&str>) -> Result<Option<String>> {
        self.resolver.resolve(company, country).await
    }

    /// Gather research for `ticker` and debate it for the configured number of rounds
    pub async fn analyze(&self, ticker: &str, sink: Option<&dyn StreamSink>) -> AnalysisReport {
        self.analyze_with_cancel(ticker, sink, &CancellationToken::new())
            .await
    }

    /// Like [`analyze`](Self::analyze), stopping early once `cancel` fires
    #[tracing::instrument(skip(self, sink, cancel))]
    pub async fn analyze_with_cancel(
        &self,
        ticker: &str,
        sink: Option<&dyn StreamSink>,
        cancel: &CancellationToken,
    ) -> AnalysisReport {
        let research = match self.research.gather(ticker).await {
            Ok(research) => research,
            Err(e) => {
                tracing::warn!(ticker, error = %e, "Research failed, skipping debate");
                let conclusion = format!(
                    "Unable to debate {ticker}: research could not be gathered ({e})."
                );
                return AnalysisReport::new(
                    None,
                    DebateResult::failed(ticker, e.to_string(), conclusion),
                );
            }
        };

        let rounds = self.config().rounds;
        let result = self
            .orchestrator
            .run_debate_with_cancel(&research.ticker, &research, rounds, sink, cancel)
            .await;

        AnalysisReport::new(Some(research), result)
    }
}
