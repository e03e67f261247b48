//! Company name to ticker lookup via a single completion

use crate::error::{DebateError, Result};
use crate::prompts::{SYMBOL_RESOLVER_SYSTEM_PROMPT, SYMBOL_TEMPLATE, render};
use debate_llm::{CompletionRequest, LLMProvider, Message};
use minijinja::context;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;

const TICKER_PATTERN: &str = r"^[A-Z0-9.\-^=]{1,15}$";
const UNKNOWN: &str = "UNKNOWN";

/// Resolves company names to exchange tickers
///
/// One completion per lookup and no retries. Anything that does not look like
/// a ticker is reported as unresolved.
pub struct SymbolResolver {
    provider: Arc<dyn LLMProvider>,
    model: String,
    timeout: Duration,
    pattern: Regex,
}

impl SymbolResolver {
    /// Create a resolver using the given provider and model
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let pattern = Regex::new(TICKER_PATTERN)
            .map_err(|e| DebateError::Configuration(format!("Invalid ticker pattern: {e}")))?;

        Ok(Self {
            provider,
            model: model.into(),
            timeout,
            pattern,
        })
    }

    /// Look up the ticker for a company, optionally scoped to a country
    ///
    /// Returns `Ok(None)` when the model does not know the company.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, company: &str, country: Option<&str>) -> Result<Option<String>> {
        let company = company.trim();
        if company.is_empty() {
            return Ok(None);
        }

        let prompt = render(SYMBOL_TEMPLATE, context! { company, country })?;

        let request = CompletionRequest::builder(&self.model)
            .system(SYMBOL_RESOLVER_SYSTEM_PROMPT)
            .add_message(Message::user(prompt))
            .max_tokens(20)
            .temperature(0.0)
            .build();

        let response = tokio::time::timeout(self.timeout, self.provider.complete(request))
            .await
            .map_err(|_| DebateError::Timeout(self.timeout))??;

        let ticker = self.parse(response.text());
        match &ticker {
            Some(symbol) => tracing::info!(company, symbol = %symbol, "Resolved ticker"),
            None => tracing::warn!(company, raw = response.text(), "Could not resolve ticker"),
        }
        Ok(ticker)
    }

    /// Clean and validate a raw model answer
    fn parse(&self, raw: &str) -> Option<String> {
        let candidate = raw
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())?
            .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '*' | '.'))
            .to_ascii_uppercase();

        if candidate == UNKNOWN || !self.pattern.is_match(&candidate) {
            return None;
        }
        Some(candidate)
    }
}
