//! Final recommendation from a finished transcript

use super::result::{Recommendation, Transcript, Verdict};
use crate::agents::PersonaId;
use crate::config::{DebateConfig, MAX_VERDICT_TEMPERATURE, VerdictStrategy};
use crate::error::{DebateError, Result};
use crate::prompts::{JUDGE_SYSTEM_PROMPT, VERDICT_TEMPLATE, debate_topic, render};
use debate_llm::{CompletionRequest, LLMProvider, Message};
use minijinja::context;
use std::sync::Arc;
use std::time::Duration;

/// Conclusion used when the judge call fails or returns nothing
pub const VERDICT_UNAVAILABLE: &str =
    "Unable to reach a conclusion: the verdict could not be generated from this debate.";

/// Conclusion used when no turn produced an argument
pub const NO_ARGUMENTS: &str =
    "No arguments were recorded in this debate, so no recommendation can be made.";

/// Score margin above which the heuristic picks a side
const HEURISTIC_THRESHOLD: f64 = 0.25;

/// Excerpts quoted for a decisive heuristic verdict
const HEURISTIC_EXCERPTS: usize = 3;

const EXCERPT_MAX_CHARS: usize = 240;

/// Turns a transcript into a conclusion and a structured [`Verdict`]
///
/// Never fails: problems are reported through the conclusion text.
pub struct VerdictSynthesizer {
    provider: Arc<dyn LLMProvider>,
    model: String,
    strategy: VerdictStrategy,
    temperature: f32,
    max_tokens: usize,
    timeout: Duration,
}

impl VerdictSynthesizer {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &DebateConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            strategy: config.verdict_strategy,
            temperature: config.verdict_temperature.min(MAX_VERDICT_TEMPERATURE),
            max_tokens: config.verdict_max_tokens,
            timeout: config.turn_timeout,
        }
    }

    pub fn strategy(&self) -> VerdictStrategy {
        self.strategy
    }

    /// Produce the conclusion with the configured strategy
    pub async fn synthesize(&self, ticker: &str, transcript: &Transcript) -> (String, Verdict) {
        match self.strategy {
            VerdictStrategy::Heuristic => heuristic_verdict(transcript),
            VerdictStrategy::Model => self.model_verdict(ticker, transcript).await,
        }
    }

    #[tracing::instrument(skip(self, transcript), fields(turns = transcript.len()))]
    async fn model_verdict(&self, ticker: &str, transcript: &Transcript) -> (String, Verdict) {
        let empty = |conclusion: &str| {
            (
                conclusion.to_string(),
                Verdict {
                    recommendation: None,
                    confidence: None,
                    excerpts: Vec::new(),
                    strategy: VerdictStrategy::Model,
                },
            )
        };

        if transcript.successful().next().is_none() {
            return empty(NO_ARGUMENTS);
        }

        match self.ask_judge(ticker, transcript).await {
            Ok(text) => {
                let recommendation = Recommendation::from_text(&text);
                tracing::info!(?recommendation, "Verdict synthesized");
                (
                    text,
                    Verdict {
                        recommendation,
                        confidence: None,
                        excerpts: Vec::new(),
                        strategy: VerdictStrategy::Model,
                    },
                )
            }
            Err(e) => {
                tracing::warn!(error = %e, "Verdict generation failed");
                empty(VERDICT_UNAVAILABLE)
            }
        }
    }

    async fn ask_judge(&self, ticker: &str, transcript: &Transcript) -> Result<String> {
        let messages: Vec<_> = transcript
            .successful()
            .map(|turn| {
                context! {
                    role => turn.speaker.persona().display_name,
                    content => turn.content.trim(),
                }
            })
            .collect();

        let prompt = render(
            VERDICT_TEMPLATE,
            context! { topic => debate_topic(ticker), messages },
        )?;

        let request = CompletionRequest::builder(&self.model)
            .system(JUDGE_SYSTEM_PROMPT)
            .add_message(Message::user(prompt))
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .build();

        let response = tokio::time::timeout(self.timeout, self.provider.complete(request))
            .await
            .map_err(|_| DebateError::Timeout(self.timeout))??;

        let text = response.text().trim();
        if text.is_empty() {
            return Err(DebateError::MalformedResponse("empty verdict".to_string()));
        }
        Ok(text.to_string())
    }
}

/// Turn-count scoring over the transcript
///
/// Counts successful turns per side, so it measures participation rather than
/// argument strength: a complete alternating debate always comes out as HOLD.
pub fn heuristic_verdict(transcript: &Transcript) -> (String, Verdict) {
    let excerpts_of = |side: PersonaId| -> Vec<String> {
        transcript
            .successful()
            .filter(|turn| turn.speaker == side)
            .filter_map(|turn| first_sentence(&turn.content))
            .collect()
    };

    let bull = excerpts_of(PersonaId::Bull);
    let bear = excerpts_of(PersonaId::Bear);
    let total = bull.len() + bear.len();
    let confidence = bull.len().abs_diff(bear.len()) as f64 / total.max(1) as f64;

    let (recommendation, excerpts, body) = if confidence > HEURISTIC_THRESHOLD {
        let (recommendation, side, side_excerpts) = if bull.len() > bear.len() {
            (Recommendation::Buy, PersonaId::Bull, bull)
        } else {
            (Recommendation::Sell, PersonaId::Bear, bear)
        };
        let recent: Vec<String> = side_excerpts
            .iter()
            .rev()
            .take(HEURISTIC_EXCERPTS)
            .rev()
            .cloned()
            .collect();
        let mut body = format!("Key arguments from the {}:", side.persona().display_name);
        for excerpt in &recent {
            body.push_str(&format!("\n- {excerpt}"));
        }
        (recommendation, recent, body)
    } else {
        let mut excerpts = Vec::new();
        let mut body = String::from("The debate was balanced.");
        for (side, side_excerpts) in [(PersonaId::Bull, &bull), (PersonaId::Bear, &bear)] {
            if let Some(leading) = side_excerpts.first() {
                body.push_str(&format!("\n- {}: {leading}", side.persona().display_name));
                excerpts.push(leading.clone());
            }
        }
        if excerpts.is_empty() {
            body = NO_ARGUMENTS.to_string();
        }
        (Recommendation::Hold, excerpts, body)
    };

    let conclusion = format!(
        "Recommendation: {recommendation} ({:.0}% confidence)\n\n{body}",
        confidence * 100.0
    );

    (
        conclusion,
        Verdict {
            recommendation: Some(recommendation),
            confidence: Some(confidence),
            excerpts,
            strategy: VerdictStrategy::Heuristic,
        },
    )
}

/// First sentence of a turn, capped in length
fn first_sentence(content: &str) -> Option<String> {
    let content = content.trim();
    if content.is_empty() {
        return None;
    }

    let end = content
        .char_indices()
        .find(|&(i, c)| {
            c == '\n'
                || (matches!(c, '.' | '!' | '?')
                    && content[i + c.len_utf8()..]
                        .chars()
                        .next()
                        .is_none_or(char::is_whitespace))
        })
        .map_or(content.len(), |(i, c)| if c == '\n' { i } else { i + c.len_utf8() });

    let sentence = content[..end].trim();
    if sentence.chars().count() <= EXCERPT_MAX_CHARS {
        return Some(sentence.to_string());
    }
    let truncated: String = sentence.chars().take(EXCERPT_MAX_CHARS).collect();
    Some(format!("{}...", truncated.trim_end()))
}
