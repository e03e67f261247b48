//! Turn-taking debate loop
//!
//! Drives `2 × rounds` strictly alternating turns, feeds each persona the
//! research plus the opponent's latest argument, and hands the finished
//! transcript to the verdict synthesizer. Entry points never return an error:
//! failures end up in [`DebateResult::error`].

use super::context::ContextAssembler;
use super::result::{DebateResult, Transcript, Turn};
use super::session::{InMemorySessionStore, SessionId, SessionStore};
use super::sink::StreamSink;
use super::verdict::VerdictSynthesizer;
use crate::agents::PersonaId;
use crate::config::{DebateConfig, FailurePolicy, validate_rounds};
use crate::error::{DebateError, Result};
use crate::research::ResearchContext;
use chrono::Utc;
use debate_llm::{CompletionRequest, LLMProvider, Message, collect_stream};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Lifecycle of one debate run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebateState {
    NotStarted,
    Running { turn: usize },
    Concluding,
    Done,
    Errored,
}

impl DebateState {
    /// Whether moving to `next` is a legal step
    pub fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::NotStarted, Self::Running { turn: 0 }) => true,
            (Self::Running { turn }, Self::Running { turn: next_turn }) => next_turn == turn + 1,
            (Self::NotStarted | Self::Running { .. }, Self::Concluding) => true,
            (Self::NotStarted | Self::Running { .. }, Self::Errored) => true,
            (Self::Concluding, Self::Done) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Errored)
    }
}

/// Mutable state of a single run, owned by the loop
struct DebateRun<'a> {
    ticker: &'a str,
    state: DebateState,
    transcript: Transcript,
    error: Option<String>,
    session: Option<SessionId>,
}

impl<'a> DebateRun<'a> {
    fn new(ticker: &'a str) -> Self {
        Self {
            ticker,
            state: DebateState::NotStarted,
            transcript: Transcript::new(),
            error: None,
            session: None,
        }
    }

    fn advance(&mut self, next: DebateState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {next:?}",
            self.state
        );
        tracing::debug!(ticker = self.ticker, from = ?self.state, to = ?next, "State transition");
        self.state = next;
    }
}

/// Runs debates between the bull and bear personas
pub struct DebateOrchestrator {
    provider: Arc<dyn LLMProvider>,
    config: DebateConfig,
    verdict: VerdictSynthesizer,
    sessions: Arc<dyn SessionStore>,
}

impl DebateOrchestrator {
    /// Create an orchestrator; the configuration is validated up front
    pub fn new(provider: Arc<dyn LLMProvider>, config: DebateConfig) -> Result<Self> {
        config.validate()?;
        let verdict = VerdictSynthesizer::new(Arc::clone(&provider), &config);
        Ok(Self {
            provider,
            config,
            verdict,
            sessions: Arc::new(InMemorySessionStore::new()),
        })
    }

    /// Mirror transcripts into a different session store
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = store;
        self
    }

    pub fn config(&self) -> &DebateConfig {
        &self.config
    }

    /// Run a full debate
    ///
    /// With a sink, turns are streamed and every fragment is forwarded as it
    /// arrives; without one each turn is a single completion call.
    pub async fn run_debate(
        &self,
        ticker: &str,
        research: &ResearchContext,
        rounds: usize,
        sink: Option<&dyn StreamSink>,
    ) -> DebateResult {
        self.run_debate_with_cancel(ticker, research, rounds, sink, &CancellationToken::new())
            .await
    }

    /// Run a full debate that stops early once `cancel` fires
    ///
    /// Cancellation is checked between turns and raced against the turn in
    /// flight; dropping the in-flight request closes its connection.
    #[tracing::instrument(skip(self, research, sink, cancel), fields(streaming = sink.is_some()))]
    pub async fn run_debate_with_cancel(
        &self,
        ticker: &str,
        research: &ResearchContext,
        rounds: usize,
        sink: Option<&dyn StreamSink>,
        cancel: &CancellationToken,
    ) -> DebateResult {
        let started_at = Utc::now();
        let mut run = DebateRun::new(ticker);

        if let Err(e) = validate_rounds(rounds) {
            return self.finish_errored(run, e, started_at).await;
        }
        if research.metrics.is_empty() {
            let e = DebateError::unavailable(ticker, "No metrics available");
            return self.finish_errored(run, e, started_at).await;
        }

        tracing::info!(
            ticker,
            rounds,
            first_mover = %self.config.first_mover,
            "Starting debate"
        );

        run.session = match self.sessions.create(ticker).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "Session store unavailable, continuing without mirror");
                None
            }
        };

        let assembler = ContextAssembler::new(rounds);
        let mut failure: Option<DebateError> = None;

        for turn_index in 0..rounds * 2 {
            if cancel.is_cancelled() {
                failure = Some(DebateError::Cancelled);
                break;
            }
            run.advance(DebateState::Running { turn: turn_index });

            let speaker = self.speaker_for(turn_index);
            let round_index = turn_index / 2;

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => Err(DebateError::Cancelled),
                outcome = self.take_turn(&assembler, speaker, research, &run.transcript, sink) => outcome,
            };

            if let Some(sink) = sink {
                sink.on_turn_end(speaker);
            }

            match outcome {
                Ok(content) => {
                    tracing::info!(
                        turn = turn_index,
                        speaker = %speaker,
                        chars = content.len(),
                        "Turn completed"
                    );
                    tracing::debug!(
                        turn = turn_index,
                        speaker = %speaker,
                        content = %content,
                        "Turn content"
                    );
                    self.record(&mut run, Turn::success(speaker, round_index, content))
                        .await;
                }
                Err(e) => {
                    tracing::warn!(turn = turn_index, speaker = %speaker, error = %e, "Turn failed");
                    self.record(&mut run, Turn::placeholder(speaker, round_index, e.to_string()))
                        .await;

                    let abort = matches!(e, DebateError::Cancelled)
                        || self.config.failure_policy == FailurePolicy::Abort;
                    if abort {
                        failure = Some(e);
                        break;
                    }
                    // continue policy: remember the first failure but keep debating
                    if run.error.is_none() {
                        run.error = Some(e.to_string());
                    }
                }
            }
        }

        if let Some(e) = failure {
            return self.finish_errored(run, e, started_at).await;
        }

        run.advance(DebateState::Concluding);
        let (conclusion, verdict) = self.verdict.synthesize(ticker, &run.transcript).await;
        run.advance(DebateState::Done);

        tracing::info!(
            ticker,
            turns = run.transcript.len(),
            recommendation = ?verdict.recommendation,
            "Debate concluded"
        );
        tracing::debug!(ticker, conclusion = %conclusion, "Conclusion");

        self.close_session(&mut run).await;

        DebateResult {
            ticker: ticker.to_string(),
            transcript: run.transcript,
            conclusion,
            verdict: Some(verdict),
            error: run.error,
            started_at,
            finished_at: Utc::now(),
        }
    }

    fn speaker_for(&self, turn_index: usize) -> PersonaId {
        if turn_index % 2 == 0 {
            self.config.first_mover
        } else {
            self.config.first_mover.opponent()
        }
    }

    /// Assemble the prompt and obtain one completion, bounded by the turn timeout
    async fn take_turn(
        &self,
        assembler: &ContextAssembler,
        speaker: PersonaId,
        research: &ResearchContext,
        transcript: &Transcript,
        sink: Option<&dyn StreamSink>,
    ) -> Result<String> {
        let persona = speaker.persona();
        let prompt = assembler.assemble(persona, research, transcript, transcript.last())?;

        let request = CompletionRequest::builder(&self.config.model)
            .system(prompt.system)
            .add_message(Message::user(prompt.user))
            .max_tokens(persona.max_response_tokens)
            .temperature(persona.temperature)
            .build();

        tracing::debug!(speaker = %speaker, prompt_chars = request.prompt_chars(), "Requesting turn");

        let timeout = self.config.turn_timeout;
        let content = tokio::time::timeout(timeout, self.complete(request, speaker, sink))
            .await
            .map_err(|_| DebateError::Timeout(timeout))??;

        if content.trim().is_empty() {
            return Err(DebateError::MalformedResponse(format!(
                "{} returned an empty response",
                persona.display_name
            )));
        }
        Ok(content)
    }

    async fn complete(
        &self,
        request: CompletionRequest,
        speaker: PersonaId,
        sink: Option<&dyn StreamSink>,
    ) -> Result<String> {
        match sink {
            Some(sink) => {
                let stream = self.provider.complete_stream(request).await?;
                Ok(collect_stream(stream, |fragment| sink.on_fragment(speaker, fragment)).await?)
            }
            None => {
                let response = self.provider.complete(request).await?;
                if response.is_truncated() {
                    tracing::warn!(speaker = %speaker, "Argument hit the token cap");
                }
                Ok(response.message.content)
            }
        }
    }

    /// Append to the transcript and mirror the turn; mirror failures are only logged
    async fn record(&self, run: &mut DebateRun<'_>, turn: Turn) {
        if let Some(session) = &run.session {
            if let Err(e) = self.sessions.append(session, &turn).await {
                tracing::warn!(session = %session, error = %e, "Failed to mirror turn");
            }
        }
        run.transcript.push(turn);
    }

    async fn close_session(&self, run: &mut DebateRun<'_>) {
        if let Some(session) = run.session.take() {
            if let Err(e) = self.sessions.delete(&session).await {
                tracing::warn!(session = %session, error = %e, "Failed to delete session");
            }
        }
    }

    async fn finish_errored(
        &self,
        mut run: DebateRun<'_>,
        error: DebateError,
        started_at: chrono::DateTime<Utc>,
    ) -> DebateResult {
        run.advance(DebateState::Errored);
        self.close_session(&mut run).await;

        tracing::warn!(
            ticker = run.ticker,
            turns = run.transcript.len(),
            error = %error,
            "Debate ended early"
        );

        DebateResult {
            ticker: run.ticker.to_string(),
            conclusion: format!("The debate ended early ({error}); no recommendation was made."),
            transcript: run.transcript,
            verdict: None,
            error: Some(error.to_string()),
            started_at,
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VerdictStrategy;
    use crate::engine::result::Recommendation;
    use crate::engine::sink::{ChannelSink, StreamEvent};
    use crate::research::StockMetrics;
    use crate::test_support::ScriptedProvider;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn research() -> ResearchContext {
        let metrics = StockMetrics {
            current_price: Some(150.0),
            pe_ratio: Some(25.0),
            market_cap: Some(2.5e12),
            ..StockMetrics::empty("AAPL")
        };
        ResearchContext::new("AAPL", metrics)
    }

    fn config() -> crate::config::DebateConfigBuilder {
        DebateConfig::builder().turn_timeout(Duration::from_secs(5))
    }

    fn orchestrator(provider: &ScriptedProvider, config: DebateConfig) -> DebateOrchestrator {
        DebateOrchestrator::new(Arc::new(provider.clone()), config).unwrap()
    }

    #[test]
    fn test_state_transitions() {
        use DebateState::*;
        assert!(NotStarted.can_transition_to(Running { turn: 0 }));
        assert!(Running { turn: 2 }.can_transition_to(Running { turn: 3 }));
        assert!(!Running { turn: 2 }.can_transition_to(Running { turn: 2 }));
        assert!(Running { turn: 3 }.can_transition_to(Concluding));
        assert!(Running { turn: 1 }.can_transition_to(Errored));
        assert!(Concluding.can_transition_to(Done));
        assert!(!Done.can_transition_to(Running { turn: 0 }));
        assert!(Errored.is_terminal() && Done.is_terminal());
    }

    #[tokio::test]
    async fn test_full_run_alternates_speakers() {
        let provider = ScriptedProvider::new()
            .reply("Bull opening.")
            .reply("Bear opening.")
            .reply("Bull rebuttal.")
            .reply("Bear rebuttal.")
            .reply("HOLD. Both made fair points.");
        let orchestrator = orchestrator(&provider, config().build().unwrap());

        let result = orchestrator.run_debate("AAPL", &research(), 2, None).await;

        assert!(result.error.is_none());
        let speakers: Vec<_> = result.transcript.iter().map(|t| t.speaker).collect();
        assert_eq!(
            speakers,
            vec![PersonaId::Bull, PersonaId::Bear, PersonaId::Bull, PersonaId::Bear]
        );
        let rounds: Vec<_> = result.transcript.iter().map(|t| t.round_index).collect();
        assert_eq!(rounds, vec![0, 0, 1, 1]);
        assert_eq!(result.recommendation(), Some(Recommendation::Hold));
        assert_eq!(provider.call_count(), 5);

        // Each response prompt quotes only the previous turn
        let requests = provider.requests();
        assert!(requests[1].messages[0].content.contains("Bull opening."));
        assert!(requests[3].messages[0].content.contains("Bull rebuttal."));
        assert!(!requests[3].messages[0].content.contains("Bull opening."));
        assert_eq!(requests[0].temperature, Some(0.7));
        assert_eq!(requests[0].max_tokens, 1000);
    }

    #[tokio::test]
    async fn test_turn_content_and_conclusion_logged_at_debug() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(logs.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let provider = ScriptedProvider::new()
            .reply("Margins keep expanding.")
            .reply("Valuation already prices that in.")
            .reply("SELL. The bear case on valuation held up.");
        let orchestrator = orchestrator(&provider, config().build().unwrap());

        let result = orchestrator.run_debate("AAPL", &research(), 1, None).await;
        assert!(result.is_success());

        let output = logs.contents();
        assert!(output.contains("Margins keep expanding."));
        assert!(output.contains("Valuation already prices that in."));
        assert!(output.contains(result.conclusion.trim()));
    }

    #[tokio::test]
    async fn test_bear_can_open() {
        let provider = ScriptedProvider::new().otherwise("An argument.");
        let config = config()
            .first_mover(PersonaId::Bear)
            .verdict_strategy(VerdictStrategy::Heuristic)
            .build()
            .unwrap();
        let result = orchestrator(&provider, config)
            .run_debate("AAPL", &research(), 1, None)
            .await;

        assert_eq!(result.transcript.turns()[0].speaker, PersonaId::Bear);
        assert_eq!(result.transcript.turns()[1].speaker, PersonaId::Bull);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_provider_error_aborts() {
        let provider = ScriptedProvider::new()
            .reply("Bull opening.")
            .fail("backend unavailable")
            .otherwise("should never be used");
        let orchestrator = orchestrator(&provider, config().build().unwrap());

        let result = orchestrator.run_debate("AAPL", &research(), 2, None).await;

        assert_eq!(result.transcript.len(), 2);
        assert!(!result.transcript.turns()[0].is_placeholder());
        let placeholder = &result.transcript.turns()[1];
        assert!(placeholder.is_placeholder());
        assert!(placeholder.content.is_empty());
        assert!(result.error.as_deref().unwrap().contains("backend unavailable"));
        assert!(!result.conclusion.is_empty());
        assert!(result.verdict.is_none());
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_continue_policy_keeps_going() {
        let provider = ScriptedProvider::new()
            .reply("Bull opening.")
            .fail("hiccup")
            .reply("Bull again.")
            .reply("Bear finally.");
        let config = config()
            .failure_policy(FailurePolicy::Continue)
            .verdict_strategy(VerdictStrategy::Heuristic)
            .build()
            .unwrap();
        let result = orchestrator(&provider, config)
            .run_debate("AAPL", &research(), 2, None)
            .await;

        assert_eq!(result.transcript.len(), 4);
        assert!(result.transcript.turns()[1].is_placeholder());
        assert!(result.error.is_some());
        assert!(result.verdict.is_some());

        // The placeholder is not quoted as an argument
        let requests = provider.requests();
        assert!(!requests[2].messages[0].content.contains("just argued"));
    }

    #[tokio::test]
    async fn test_empty_response_is_malformed() {
        let provider = ScriptedProvider::new().reply("   ");
        let result = orchestrator(&provider, config().build().unwrap())
            .run_debate("AAPL", &research(), 1, None)
            .await;

        assert_eq!(result.transcript.len(), 1);
        assert!(result.error.as_deref().unwrap().contains("Malformed response"));
    }

    #[tokio::test]
    async fn test_timeout_stops_run() {
        let provider = ScriptedProvider::new()
            .reply("Bull opening.")
            .slow(Duration::from_secs(5), "too late");
        let config = config()
            .turn_timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let result = orchestrator(&provider, config)
            .run_debate("AAPL", &research(), 3, None)
            .await;

        assert_eq!(result.transcript.len(), 2);
        assert!(result.error.as_deref().unwrap().contains("timed out"));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_mid_turn() {
        let provider = ScriptedProvider::new()
            .reply("Bull opening.")
            .slow(Duration::from_secs(5), "never delivered");
        let orchestrator = orchestrator(&provider, config().build().unwrap());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = orchestrator
            .run_debate_with_cancel("AAPL", &research(), 3, None, &cancel)
            .await;

        assert_eq!(result.transcript.len(), 2);
        assert_eq!(result.error.as_deref(), Some("Debate cancelled"));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let provider = ScriptedProvider::new().otherwise("unused");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = orchestrator(&provider, config().build().unwrap())
            .run_debate_with_cancel("AAPL", &research(), 2, None, &cancel)
            .await;

        assert!(result.transcript.is_empty());
        assert_eq!(result.error.as_deref(), Some("Debate cancelled"));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_streaming_forwards_fragments() {
        let provider = ScriptedProvider::new()
            .reply("Revenue is growing fast.")
            .reply("Valuation looks stretched here.");
        let config = config()
            .verdict_strategy(VerdictStrategy::Heuristic)
            .build()
            .unwrap();
        let (sink, mut rx) = ChannelSink::new();

        let result = orchestrator(&provider, config)
            .run_debate("AAPL", &research(), 1, Some(&sink))
            .await;
        drop(sink);

        let mut streamed: Vec<(PersonaId, String)> = Vec::new();
        let mut current = String::new();
        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::Fragment { text, .. } => current.push_str(&text),
                StreamEvent::TurnEnd { speaker } => {
                    streamed.push((speaker, std::mem::take(&mut current)));
                }
            }
        }

        assert!(current.is_empty());
        assert_eq!(streamed.len(), 2);
        for (turn, (speaker, text)) in result.transcript.iter().zip(&streamed) {
            assert_eq!(turn.speaker, *speaker);
            assert_eq!(&turn.content, text);
        }
    }

    #[tokio::test]
    async fn test_broken_stream_fails_turn() {
        let provider = ScriptedProvider::new().broken_stream("Partial thought", "connection reset");
        let (sink, _rx) = ChannelSink::new();

        let result = orchestrator(&provider, config().build().unwrap())
            .run_debate("AAPL", &research(), 1, Some(&sink))
            .await;

        assert_eq!(result.transcript.len(), 1);
        assert!(result.transcript.turns()[0].is_placeholder());
        assert!(result.error.as_deref().unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_invalid_rounds_and_empty_metrics() {
        let provider = ScriptedProvider::new().otherwise("unused");
        let orchestrator = orchestrator(&provider, config().build().unwrap());

        let result = orchestrator.run_debate("AAPL", &research(), 0, None).await;
        assert!(result.error.is_some());

        let empty = ResearchContext::new("AAPL", StockMetrics::empty("AAPL"));
        let result = orchestrator.run_debate("AAPL", &empty, 2, None).await;
        assert!(result.error.as_deref().unwrap().contains("Data not available"));
        assert_eq!(provider.call_count(), 0);
    }

    struct BrokenStore;

    #[async_trait]
    impl SessionStore for BrokenStore {
        async fn create(&self, _ticker: &str) -> Result<SessionId> {
            Ok(SessionId::new())
        }

        async fn append(&self, _session: &SessionId, _turn: &Turn) -> Result<()> {
            Err(DebateError::Other("store offline".to_string()))
        }

        async fn delete(&self, _session: &SessionId) -> Result<()> {
            Err(DebateError::Other("store offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_session_mirror_failures_are_not_fatal() {
        let provider = ScriptedProvider::new().otherwise("An argument.");
        let config = config()
            .verdict_strategy(VerdictStrategy::Heuristic)
            .build()
            .unwrap();
        let result = orchestrator(&provider, config)
            .with_session_store(Arc::new(BrokenStore))
            .run_debate("AAPL", &research(), 1, None)
            .await;

        assert!(result.error.is_none());
        assert_eq!(result.transcript.len(), 2);
    }

    #[tokio::test]
    async fn test_session_deleted_after_run() {
        let provider = ScriptedProvider::new().otherwise("An argument.");
        let store = InMemorySessionStore::new();
        let config = config()
            .verdict_strategy(VerdictStrategy::Heuristic)
            .build()
            .unwrap();
        let result = orchestrator(&provider, config)
            .with_session_store(Arc::new(store.clone()))
            .run_debate("AAPL", &research(), 1, None)
            .await;

        assert!(result.is_success());
        assert!(store.is_empty().await);
    }
}
