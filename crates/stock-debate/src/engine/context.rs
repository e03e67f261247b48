//! Per-turn prompt assembly
//!
//! Each turn sees the research, the debate status and at most the single most
//! recent opposing turn. The full history is never re-sent, so prompt size
//! stays bounded regardless of how many rounds are played.

use super::result::{Transcript, Turn};
use crate::agents::Persona;
use crate::error::Result;
use crate::prompts::{OPENING_DIRECTIVE, RESPONSE_DIRECTIVE, TURN_TEMPLATE, debate_topic, render};
use crate::research::{NewsItem, ResearchContext, StockMetrics};
use minijinja::context;
use serde::Serialize;

const NOT_AVAILABLE: &str = "N/A";

/// System and user prompt for one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnPrompt {
    pub system: String,
    pub user: String,
}

impl TurnPrompt {
    pub fn len(&self) -> usize {
        self.system.len() + self.user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.system.is_empty() && self.user.is_empty()
    }
}

#[derive(Serialize)]
struct MetricsView {
    current_price: String,
    pe_ratio: String,
    market_cap: String,
    week_52_high: String,
    week_52_low: String,
    dividend_yield: String,
    volume: String,
    avg_volume: String,
    beta: String,
}

impl MetricsView {
    fn new(metrics: &StockMetrics) -> Self {
        let symbol = metrics.currency_symbol();
        let money = |value: Option<f64>| value.map_or_else(na, |v| format_money(v, symbol));
        let plain = |value: Option<f64>| value.map_or_else(na, |v| format!("{v:.2}"));
        let count = |value: Option<u64>| value.map_or_else(na, format_count);

        Self {
            current_price: money(metrics.current_price),
            pe_ratio: plain(metrics.pe_ratio),
            market_cap: money(metrics.market_cap),
            week_52_high: money(metrics.week_52_high),
            week_52_low: money(metrics.week_52_low),
            dividend_yield: metrics
                .dividend_yield
                .map_or_else(na, |v| format!("{v:.2}%")),
            volume: count(metrics.volume),
            avg_volume: count(metrics.avg_volume),
            beta: plain(metrics.beta),
        }
    }
}

#[derive(Serialize)]
struct NewsView<'a> {
    title: &'a str,
    date: &'a str,
    summary: &'a str,
    url: &'a str,
}

impl<'a> NewsView<'a> {
    fn new(item: &'a NewsItem) -> Self {
        Self {
            title: &item.title,
            date: item.date.as_deref().unwrap_or("date unknown"),
            summary: &item.summary,
            url: &item.url,
        }
    }
}

fn na() -> String {
    NOT_AVAILABLE.to_string()
}

/// Format an amount with a currency symbol, two decimals and thousands separators
pub fn format_money(value: f64, symbol: &str) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{symbol}{}", group_thousands(value.abs()))
}

/// Two decimals with thousands separators, e.g. `2,500,000,000,000.00`
pub fn group_thousands(value: f64) -> String {
    let fixed = format!("{value:.2}");
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };
    format!("{sign}{}.{frac_part}", insert_commas(digits))
}

/// Integer with thousands separators
pub fn format_count(value: u64) -> String {
    insert_commas(&value.to_string())
}

fn insert_commas(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Builds [`TurnPrompt`]s; pure, holds only the run length
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    rounds: usize,
}

impl ContextAssembler {
    pub fn new(rounds: usize) -> Self {
        Self { rounds }
    }

    /// Assemble the prompt for `persona`'s next turn
    ///
    /// `opponent_last_turn` is the turn being answered; `None` makes this an
    /// opening statement.
    pub fn assemble(
        &self,
        persona: &Persona,
        research: &ResearchContext,
        transcript: &Transcript,
        opponent_last_turn: Option<&Turn>,
    ) -> Result<TurnPrompt> {
        let round = transcript.iter().filter(|t| t.speaker == persona.id).count() + 1;

        let opponent = opponent_last_turn
            .filter(|turn| !turn.is_placeholder())
            .map(|turn| {
                context! {
                    name => turn.speaker.persona().display_name,
                    content => turn.content.trim(),
                }
            });

        let directive = if opponent.is_some() {
            RESPONSE_DIRECTIVE
        } else {
            OPENING_DIRECTIVE
        };

        let news: Vec<NewsView<'_>> = research.news_items.iter().map(NewsView::new).collect();
        let executive_changes: Vec<NewsView<'_>> = research
            .executive_changes
            .iter()
            .flatten()
            .map(NewsView::new)
            .collect();

        let user = render(
            TURN_TEMPLATE,
            context! {
                topic => debate_topic(&research.ticker),
                ticker => &research.ticker,
                round,
                rounds => self.rounds,
                persona_name => persona.display_name,
                metrics => MetricsView::new(&research.metrics),
                news,
                executive_changes,
                opponent,
                directive,
            },
        )?;

        Ok(TurnPrompt {
            system: persona.system_instructions.to_string(),
            user,
        })
    }
}
