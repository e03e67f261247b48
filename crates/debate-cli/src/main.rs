//! Command-line interface for stock debates
//!
//! # Usage
//!
//! ```bash
//! export OPENAI_API_KEY=...
//! export TAVILY_API_KEY=...        # optional, enables news
//! export ALPHA_VANTAGE_API_KEY=... # optional, enriches fundamentals
//!
//! stock-debate --ticker AAPL --rounds 2 --stream
//! stock-debate --company "Reliance Industries" --country India --json
//! ```

use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Parser, ValueEnum};
use debate_llm::providers::OpenAIProvider;
use debate_utils::{AppConfig, LogFormat, init_tracing_with};
use std::process::ExitCode;
use std::sync::Arc;
use stock_debate::{DebateConfig, FailurePolicy, StockDebateSystem, StreamSink, VerdictStrategy};
use tokio_util::sync::CancellationToken;

mod render;

use render::StdoutSink;

const LOG_DIRECTIVE: &str = "warn,stock_debate=info";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VerdictArg {
    /// Ask a neutral judge model
    Model,
    /// Turn-count scoring over the transcript, no extra call
    Heuristic,
}

impl From<VerdictArg> for VerdictStrategy {
    fn from(arg: VerdictArg) -> Self {
        match arg {
            VerdictArg::Model => Self::Model,
            VerdictArg::Heuristic => Self::Heuristic,
        }
    }
}

/// Bull vs. bear analyst debate over a single stock
#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
#[command(name = "stock-debate", version, about, long_about = None)]
#[command(group(ArgGroup::new("target").required(true).args(["ticker", "company"])))]
struct Cli {
    /// Ticker symbol, e.g. AAPL or RELIANCE.NS
    #[arg(short, long)]
    ticker: Option<String>,

    /// Company name to resolve into a ticker
    #[arg(short, long)]
    company: Option<String>,

    /// Country used to disambiguate the company
    #[arg(long, requires = "company")]
    country: Option<String>,

    /// Number of rounds, each one turn per side (1-10)
    #[arg(short, long)]
    rounds: Option<usize>,

    /// Print arguments as they are generated
    #[arg(long)]
    stream: bool,

    /// How the final recommendation is made
    #[arg(long, value_enum)]
    verdict: Option<VerdictArg>,

    /// Keep debating after a failed turn instead of stopping
    #[arg(long)]
    continue_on_error: bool,

    /// Model to debate with (defaults to OPENAI_MODEL or gpt-4o)
    #[arg(long)]
    model: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn debate_config(&self) -> stock_debate::Result<DebateConfig> {
        let mut builder = DebateConfig::builder();
        if let Some(model) = &self.model {
            builder = builder.model(model.clone());
        }
        if let Some(rounds) = self.rounds {
            builder = builder.rounds(rounds);
        }
        if let Some(verdict) = self.verdict {
            builder = builder.verdict_strategy(verdict.into());
        }
        if self.continue_on_error {
            builder = builder.failure_policy(FailurePolicy::Continue);
        }
        // explicit flags above take precedence over the environment
        builder.with_env_keys().build()
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let app = AppConfig::from_env();
    let log_format = if cli.log_json {
        LogFormat::Json
    } else {
        app.log_format
    };
    init_tracing_with(log_format, LOG_DIRECTIVE);
    tracing::debug!(app = %app.app_name, environment = %app.environment, "Starting");

    let config = cli.debate_config().context("Invalid debate settings")?;
    let provider = Arc::new(OpenAIProvider::from_env().context("Completion backend unavailable")?);
    let system = StockDebateSystem::new(provider, config)?;

    let ticker = match (&cli.ticker, &cli.company) {
        (Some(ticker), _) => ticker.clone(),
        (None, Some(company)) => {
            match system.resolve_symbol(company, cli.country.as_deref()).await? {
                Some(ticker) => {
                    if !cli.json {
                        println!("Resolved {company} to {ticker}");
                    }
                    ticker
                }
                None => bail!("Could not find a ticker for \"{company}\""),
            }
        }
        (None, None) => bail!("Either --ticker or --company is required"),
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping debate");
            on_interrupt.cancel();
        }
    });

    let streaming = cli.stream && !cli.json;
    let stdout_sink = StdoutSink::default();
    let sink: Option<&dyn StreamSink> = if streaming { Some(&stdout_sink) } else { None };

    if !cli.json {
        println!("Debating {} ...", ticker.trim().to_ascii_uppercase());
    }
    let report = system.analyze_with_cancel(&ticker, sink, &cancel).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render::print_report(&report, streaming);
    }

    Ok(if report.result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
