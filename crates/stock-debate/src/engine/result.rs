//! Debate transcript and result types

use crate::agents::PersonaId;
use crate::config::VerdictStrategy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One persona's contribution to the debate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: PersonaId,
    /// 0-based round of this speaker
    pub round_index: usize,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Set only on placeholder turns recorded for a failed completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Turn {
    pub(crate) fn success(speaker: PersonaId, round_index: usize, content: String) -> Self {
        Self {
            speaker,
            round_index,
            content,
            timestamp: Utc::now(),
            error: None,
        }
    }

    pub(crate) fn placeholder(speaker: PersonaId, round_index: usize, error: String) -> Self {
        Self {
            speaker,
            round_index,
            content: String::new(),
            timestamp: Utc::now(),
            error: Some(error),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.error.is_some()
    }
}

/// Append-only, ordered record of a debate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the orchestrator appends
    pub(crate) fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    /// Turns that produced content
    pub fn successful(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().filter(|t| !t.is_placeholder())
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

/// Role/content pair as handed to presentation layers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Buy,
    Sell,
    Hold,
}

impl Recommendation {
    /// First BUY, SELL or HOLD word in free text, case-insensitive
    pub fn from_text(text: &str) -> Option<Self> {
        text.split(|c: char| !c.is_ascii_alphabetic())
            .find_map(|word| match word.to_ascii_uppercase().as_str() {
                "BUY" => Some(Self::Buy),
                "SELL" => Some(Self::Sell),
                "HOLD" => Some(Self::Hold),
                _ => None,
            })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured side of the conclusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub recommendation: Option<Recommendation>,
    pub confidence: Option<f64>,
    pub excerpts: Vec<String>,
    pub strategy: VerdictStrategy,
}

/// Outcome of one debate run
///
/// Always produced, even when the run failed part-way: `error` then carries
/// the reason and `transcript` holds whatever was recorded before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateResult {
    pub ticker: String,
    pub transcript: Transcript,
    pub conclusion: String,
    pub verdict: Option<Verdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DebateResult {
    /// Result for a run that never reached its first turn
    pub fn failed(ticker: impl Into<String>, error: impl Into<String>, conclusion: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            ticker: ticker.into(),
            transcript: Transcript::new(),
            conclusion: conclusion.into(),
            verdict: None,
            error: Some(error.into()),
            started_at: now,
            finished_at: now,
        }
    }

    /// Transcript as `{role, content}` pairs, role being the persona display name
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.transcript
            .iter()
            .map(|turn| ChatMessage {
                role: turn.speaker.persona().display_name.to_string(),
                content: turn.content.clone(),
            })
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn recommendation(&self) -> Option<Recommendation> {
        self.verdict.as_ref().and_then(|v| v.recommendation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> DebateResult {
        let mut transcript = Transcript::new();
        transcript.push(Turn::success(PersonaId::Bull, 0, "Growth is strong.".to_string()));
        transcript.push(Turn::placeholder(PersonaId::Bear, 0, "Provider error: boom".to_string()));

        DebateResult {
            ticker: "AAPL".to_string(),
            transcript,
            conclusion: "HOLD: the debate was cut short.".to_string(),
            verdict: Some(Verdict {
                recommendation: Some(Recommendation::Hold),
                confidence: Some(0.5),
                excerpts: vec!["Growth is strong.".to_string()],
                strategy: VerdictStrategy::Heuristic,
            }),
            error: Some("Provider error: boom".to_string()),
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn test_messages_use_display_names() {
        let result = sample_result();
        let messages = result.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "Bullish Analyst");
        assert_eq!(messages[0].content, "Growth is strong.");
        assert_eq!(messages[1].role, "Bearish Analyst");
        assert!(messages[1].content.is_empty());
    }

    #[test]
    fn test_debate_result_serde_roundtrip() {
        let result = sample_result();
        let json = serde_json::to_string(&result).unwrap();
        let decoded: DebateResult = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, result);
    }

    #[test]
    fn test_recommendation_from_text() {
        assert_eq!(Recommendation::from_text("HOLD. Both sides..."), Some(Recommendation::Hold));
        assert_eq!(
            Recommendation::from_text("I would buy, not sell."),
            Some(Recommendation::Buy)
        );
        assert_eq!(Recommendation::from_text("Buyback plans look solid"), None);
        assert_eq!(Recommendation::from_text(""), None);
    }

    #[test]
    fn test_transcript_successful_turns() {
        let result = sample_result();
        assert_eq!(result.transcript.len(), 2);
        assert_eq!(result.transcript.successful().count(), 1);
        assert!(result.transcript.last().is_some_and(Turn::is_placeholder));
        assert!(!result.is_success());
    }
}
