//! FRED Analyst
//!
//! Answers natural-language questions about the US economy:
//! - Resolves the question to an allow-listed FRED series via Gemini
//! - Fetches and normalises the series from the FRED API
//! - Explains the trend with a second Gemini call
//! - Serves the result as chart data, text, source link and CSV export
//!
//! PIPELINE:
//! QUERY → RESOLVE → FETCH → EXPLAIN → RESPOND

pub mod agent;
pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod gemini;
pub mod insight;
pub mod models;
pub mod refusal;
pub mod resolver;

pub use error::Result;

// Re-export common types
pub use agent::Orchestrator;
pub use config::AppConfig;
pub use models::*;

/// Install the fmt subscriber; `RUST_LOG` overrides `default_filter`.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
