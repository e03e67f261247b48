//! User message templates
//!
//! Templates use MiniJinja syntax and are rendered with [`render`].

use crate::error::Result;
use minijinja::{Environment, Value};

/// Per-turn prompt: research, opponent's last argument and the role directive
pub const TURN_TEMPLATE: &str = r#"Debate topic: {{ topic }}
Debate status: round {{ round }} of {{ rounds }}. You are the {{ persona_name }}.

Stock Research for {{ ticker }}

Key Metrics:
- Current Price: {{ metrics.current_price }}
- P/E Ratio: {{ metrics.pe_ratio }}
- Market Cap: {{ metrics.market_cap }}
- 52 Week Range: {{ metrics.week_52_low }} - {{ metrics.week_52_high }}
- Dividend Yield: {{ metrics.dividend_yield }}
- Volume: {{ metrics.volume }} (Avg: {{ metrics.avg_volume }})
- Beta: {{ metrics.beta }}
{% if news %}
Recent News:
{% for item in news %}- {{ item.title }} ({{ item.date }})
  {{ item.summary }}
  Source: {{ item.url }}
{% endfor %}{% else %}
Recent News: none available
{% endif %}{% if executive_changes %}
Executive Changes:
{% for item in executive_changes %}- {{ item.title }} ({{ item.date }})
  {{ item.summary }}
  Source: {{ item.url }}
{% endfor %}{% endif %}{% if opponent %}
Your opponent ({{ opponent.name }}) just argued:
"""
{{ opponent.content }}
"""
{% endif %}
{{ directive }}"#;

/// Directive for the first turn of a side with nothing to answer
pub const OPENING_DIRECTIVE: &str =
    "Present your concise opening analysis of the stock from your perspective.";

/// Directive for every turn that answers the opponent
pub const RESPONSE_DIRECTIVE: &str =
    "Address your opponent's argument and advance your case.";

/// Judge prompt for the model verdict
pub const VERDICT_TEMPLATE: &str = r"Based on the following debate about {{ topic }}, decide whether to buy, sell, or hold the stock. Provide a brief justification based only on the arguments presented. Start your answer with BUY, SELL or HOLD.

Debate:
{% for message in messages %}{{ message.role }}: {{ message.content }}
{% endfor %}";

/// Symbol lookup prompt
pub const SYMBOL_TEMPLATE: &str = r"Company: {{ company }}
{% if country %}Country: {{ country }}
{% endif %}Ticker:";

/// Debate topic for a ticker
pub fn debate_topic(ticker: &str) -> String {
    format!("Should we buy {ticker} stock?")
}

/// Render a template with the given variables
pub fn render(template: &str, vars: Value) -> Result<String> {
    let env = Environment::new();
    Ok(env.render_str(template, vars)?)
}
