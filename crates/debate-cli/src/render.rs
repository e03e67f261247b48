//! Terminal output for debate reports

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use std::io::Write;
use std::sync::Mutex;
use stock_debate::engine::context::{format_count, format_money};
use stock_debate::{AnalysisReport, DebateResult, PersonaId, StockMetrics, StreamSink};

const NOTICE: &str = "Not financial advice. This debate is generated by language models from public data \
and may be wrong or out of date.";

/// Prints streamed fragments to stdout as they arrive
#[derive(Default)]
pub struct StdoutSink {
    speaking: Mutex<Option<PersonaId>>,
}

impl StreamSink for StdoutSink {
    fn on_fragment(&self, speaker: PersonaId, fragment: &str) {
        let mut stdout = std::io::stdout().lock();
        if let Ok(mut speaking) = self.speaking.lock() {
            if speaking.is_none() {
                let _ = writeln!(stdout, "\n{}:", speaker.persona().display_name);
                *speaking = Some(speaker);
            }
        }
        let _ = stdout.write_all(fragment.as_bytes());
        let _ = stdout.flush();
    }

    fn on_turn_end(&self, _speaker: PersonaId) {
        if let Ok(mut speaking) = self.speaking.lock() {
            *speaking = None;
        }
        println!();
    }
}

fn metrics_table(metrics: &StockMetrics) -> Table {
    let symbol = metrics.currency_symbol();
    let money = |v: Option<f64>| v.map_or_else(|| "N/A".to_string(), |v| format_money(v, symbol));
    let plain = |v: Option<f64>| v.map_or_else(|| "N/A".to_string(), |v| format!("{v:.2}"));
    let count = |v: Option<u64>| v.map_or_else(|| "N/A".to_string(), format_count);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Metric").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    let rows = [
        ("Current Price", money(metrics.current_price)),
        ("P/E Ratio", plain(metrics.pe_ratio)),
        ("Market Cap", money(metrics.market_cap)),
        ("52 Week High", money(metrics.week_52_high)),
        ("52 Week Low", money(metrics.week_52_low)),
        (
            "Dividend Yield",
            metrics
                .dividend_yield
                .map_or_else(|| "N/A".to_string(), |v| format!("{v:.2}%")),
        ),
        ("Volume", count(metrics.volume)),
        ("Avg Volume", count(metrics.avg_volume)),
        ("Beta", plain(metrics.beta)),
    ];
    for (name, value) in rows {
        table.add_row(vec![Cell::new(name), Cell::new(value)]);
    }
    table
}

fn print_transcript(result: &DebateResult) {
    for turn in &result.transcript {
        let name = turn.speaker.persona().display_name;
        match &turn.error {
            Some(error) => println!("\n{name} (round {}): [turn failed: {error}]", turn.round_index + 1),
            None => println!("\n{name} (round {}):\n{}", turn.round_index + 1, turn.content.trim()),
        }
    }
}

/// Print research, transcript and conclusion
///
/// `streamed` skips the transcript, which has already been printed live.
pub fn print_report(report: &AnalysisReport, streamed: bool) {
    let result = &report.result;

    if let Some(research) = &report.research {
        println!("Research for {}", research.ticker);
        println!("{}", metrics_table(&research.metrics));

        if !research.news_items.is_empty() {
            println!("\nRecent news:");
            for item in &research.news_items {
                println!("  - {} ({})", item.title, item.date.as_deref().unwrap_or("date unknown"));
            }
        }
    }

    if !streamed {
        print_transcript(result);
    }

    println!("\n=== Conclusion ===\n{}", result.conclusion.trim());
    if let Some(error) = &result.error {
        println!("\nThe debate did not complete cleanly: {error}");
    }
    println!("\n{NOTICE}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_table_formats_values() {
        let metrics = StockMetrics {
            current_price: Some(2950.5),
            volume: Some(1_234_567),
            ..StockMetrics::empty("RELIANCE.NS")
        };
        let rendered = metrics_table(&metrics).to_string();

        assert!(rendered.contains("₹2,950.50"));
        assert!(rendered.contains("1,234,567"));
        assert!(rendered.contains("N/A"));
    }

    #[test]
    fn test_notice_mentions_advice() {
        assert!(NOTICE.starts_with("Not financial advice"));
    }
}
