//! Configuration for research gathering and debate runs

use crate::agents::PersonaId;
use crate::error::{DebateError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on rounds per side
pub const MAX_ROUNDS: usize = 10;

/// Highest temperature allowed for the verdict call
pub const MAX_VERDICT_TEMPERATURE: f32 = 0.5;

/// What the orchestrator does after a turn fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the run at the first failed turn
    #[default]
    Abort,
    /// Record a placeholder turn and keep going
    Continue,
}

/// How the final recommendation is derived from the transcript
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStrategy {
    /// One more low-temperature completion with a neutral persona
    #[default]
    Model,
    /// Turn-count scoring over the transcript
    Heuristic,
}

/// Configuration for a debate run and its research phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateConfig {
    /// Model used for persona turns, the verdict and symbol lookup
    pub model: String,

    /// Rounds per side; a full run has twice as many turns
    pub rounds: usize,

    /// Persona that speaks on turn 0
    pub first_mover: PersonaId,

    /// Behaviour after a failed turn
    pub failure_policy: FailurePolicy,

    /// Verdict synthesis strategy
    pub verdict_strategy: VerdictStrategy,

    /// Bound on a single completion (streamed or not)
    pub turn_timeout: Duration,

    /// Token budget of the verdict call
    pub verdict_max_tokens: usize,

    /// Sampling temperature of the verdict call
    pub verdict_temperature: f32,

    /// Cache TTL for price and fundamental metrics
    pub cache_ttl_metrics: Duration,

    /// Cache TTL for news and executive changes
    pub cache_ttl_news: Duration,

    /// Number of news items requested per ticker
    pub news_max_results: usize,

    /// Number of executive-change items requested per ticker
    pub executive_max_results: usize,

    /// Request timeout for data APIs
    pub request_timeout: Duration,

    /// Tavily search API key (news is skipped without it)
    pub tavily_api_key: Option<String>,

    /// Requests per minute allowed against Tavily
    pub tavily_rate_limit: u32,

    /// Alpha Vantage API key (fundamentals enrichment is skipped without it)
    pub alpha_vantage_api_key: Option<String>,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            rounds: 3,
            first_mover: PersonaId::Bull,
            failure_policy: FailurePolicy::Abort,
            verdict_strategy: VerdictStrategy::Model,
            turn_timeout: Duration::from_secs(30),
            verdict_max_tokens: 150,
            verdict_temperature: 0.5,
            cache_ttl_metrics: Duration::from_secs(60),  // 1 minute
            cache_ttl_news: Duration::from_secs(300),    // 5 minutes
            news_max_results: 5,
            executive_max_results: 3,
            request_timeout: Duration::from_secs(30),
            tavily_api_key: None,
            tavily_rate_limit: 60,
            alpha_vantage_api_key: None,
        }
    }
}

impl DebateConfig {
    /// Create a new configuration builder
    pub fn builder() -> DebateConfigBuilder {
        DebateConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(DebateError::Configuration("model must not be empty".to_string()));
        }

        validate_rounds(self.rounds)?;

        if self.turn_timeout.is_zero() {
            return Err(DebateError::Configuration(
                "turn_timeout must be greater than 0".to_string(),
            ));
        }

        if self.verdict_max_tokens == 0 {
            return Err(DebateError::Configuration(
                "verdict_max_tokens must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=MAX_VERDICT_TEMPERATURE).contains(&self.verdict_temperature) {
            return Err(DebateError::Configuration(format!(
                "verdict_temperature must be within 0.0..={MAX_VERDICT_TEMPERATURE}"
            )));
        }

        Ok(())
    }
}

/// Check a per-side round count against the supported range
pub fn validate_rounds(rounds: usize) -> Result<()> {
    if rounds == 0 || rounds > MAX_ROUNDS {
        return Err(DebateError::Configuration(format!(
            "rounds must be between 1 and {MAX_ROUNDS}, got {rounds}"
        )));
    }
    Ok(())
}

/// Builder for DebateConfig
#[derive(Debug, Default)]
pub struct DebateConfigBuilder {
    model: Option<String>,
    rounds: Option<usize>,
    first_mover: Option<PersonaId>,
    failure_policy: Option<FailurePolicy>,
    verdict_strategy: Option<VerdictStrategy>,
    turn_timeout: Option<Duration>,
    verdict_max_tokens: Option<usize>,
    verdict_temperature: Option<f32>,
    cache_ttl_metrics: Option<Duration>,
    cache_ttl_news: Option<Duration>,
    request_timeout: Option<Duration>,
    tavily_api_key: Option<String>,
    alpha_vantage_api_key: Option<String>,
}

impl DebateConfigBuilder {
    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set rounds per side
    pub fn rounds(mut self, rounds: usize) -> Self {
        self.rounds = Some(rounds);
        self
    }

    /// Set the persona that opens the debate
    pub fn first_mover(mut self, persona: PersonaId) -> Self {
        self.first_mover = Some(persona);
        self
    }

    /// Set the failure policy
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = Some(policy);
        self
    }

    /// Set the verdict strategy
    pub fn verdict_strategy(mut self, strategy: VerdictStrategy) -> Self {
        self.verdict_strategy = Some(strategy);
        self
    }

    /// Set the per-completion timeout
    pub fn turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = Some(timeout);
        self
    }

    /// Set the verdict token budget
    pub fn verdict_max_tokens(mut self, tokens: usize) -> Self {
        self.verdict_max_tokens = Some(tokens);
        self
    }

    /// Set the verdict temperature
    pub fn verdict_temperature(mut self, temperature: f32) -> Self {
        self.verdict_temperature = Some(temperature);
        self
    }

    /// Set cache TTL for metrics
    pub fn cache_ttl_metrics(mut self, duration: Duration) -> Self {
        self.cache_ttl_metrics = Some(duration);
        self
    }

    /// Set cache TTL for news
    pub fn cache_ttl_news(mut self, duration: Duration) -> Self {
        self.cache_ttl_news = Some(duration);
        self
    }

    /// Set request timeout for data APIs
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set Tavily API key
    pub fn tavily_api_key(mut self, key: impl Into<String>) -> Self {
        self.tavily_api_key = Some(key.into());
        self
    }

    /// Set Alpha Vantage API key
    pub fn alpha_vantage_api_key(mut self, key: impl Into<String>) -> Self {
        self.alpha_vantage_api_key = Some(key.into());
        self
    }

    /// Load keys and overrides from the environment
    ///
    /// Reads `TAVILY_API_KEY`, `ALPHA_VANTAGE_API_KEY`, `OPENAI_MODEL` and
    /// `DEBATE_ROUNDS`. Values already set on the builder are kept.
    pub fn with_env_keys(mut self) -> Self {
        if self.tavily_api_key.is_none() {
            self.tavily_api_key = non_empty_env("TAVILY_API_KEY");
        }
        if self.alpha_vantage_api_key.is_none() {
            self.alpha_vantage_api_key = non_empty_env("ALPHA_VANTAGE_API_KEY");
        }
        if self.model.is_none() {
            self.model = non_empty_env("OPENAI_MODEL");
        }
        if self.rounds.is_none() {
            self.rounds = non_empty_env("DEBATE_ROUNDS").and_then(|r| r.parse().ok());
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<DebateConfig> {
        let defaults = DebateConfig::default();

        let config = DebateConfig {
            model: self.model.unwrap_or(defaults.model),
            rounds: self.rounds.unwrap_or(defaults.rounds),
            first_mover: self.first_mover.unwrap_or(defaults.first_mover),
            failure_policy: self.failure_policy.unwrap_or(defaults.failure_policy),
            verdict_strategy: self.verdict_strategy.unwrap_or(defaults.verdict_strategy),
            turn_timeout: self.turn_timeout.unwrap_or(defaults.turn_timeout),
            verdict_max_tokens: self.verdict_max_tokens.unwrap_or(defaults.verdict_max_tokens),
            verdict_temperature: self
                .verdict_temperature
                .unwrap_or(defaults.verdict_temperature),
            cache_ttl_metrics: self.cache_ttl_metrics.unwrap_or(defaults.cache_ttl_metrics),
            cache_ttl_news: self.cache_ttl_news.unwrap_or(defaults.cache_ttl_news),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            tavily_api_key: self.tavily_api_key,
            alpha_vantage_api_key: self.alpha_vantage_api_key,
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
