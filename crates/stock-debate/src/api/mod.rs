//! API clients for market data and news providers

pub mod alpha_vantage;
pub mod tavily;
pub mod yahoo;

pub use alpha_vantage::{AlphaVantageClient, CompanyOverview};
pub use tavily::TavilyClient;
pub use yahoo::{Quote, RangeSummary, YahooFinanceClient, summarize_range};
