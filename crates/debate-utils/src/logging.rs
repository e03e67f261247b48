//! Logging and tracing utilities

use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter used when `RUST_LOG` is not set
const DEFAULT_DIRECTIVE: &str = "info";

/// Output format for log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line output
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Initialize tracing subscriber with default configuration
pub fn init_tracing() {
    init_tracing_with(LogFormat::Text, DEFAULT_DIRECTIVE);
}

/// Initialize tracing subscriber emitting JSON lines
pub fn init_tracing_json() {
    init_tracing_with(LogFormat::Json, DEFAULT_DIRECTIVE);
}

/// Initialize tracing with an explicit format and fallback filter directive
///
/// Events go to stderr. `RUST_LOG` always wins over `default_directive` when
/// it is set. Calling this more than once is harmless; later calls leave the
/// first subscriber in place.
pub fn init_tracing_with(format: LogFormat, default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let result = match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true),
            )
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
