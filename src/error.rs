//! Error types for the FRED analyst service

use thiserror::Error;

/// Result type alias for analyst operations
pub type Result<T> = std::result::Result<T, AnalystError>;

#[derive(Error, Debug)]
pub enum AnalystError {

    // =============================
    // Request Pipeline Errors
    // =============================

    #[error("Unresolvable query: {0}")]
    UnresolvableQuery(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Empty series: {0}")]
    EmptySeries(String),

    #[error("Insight unavailable: {0}")]
    InsightUnavailable(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AnalystError {
    /// Stable snake_case name of the failure class, safe to expose to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalystError::UnresolvableQuery(_) => "unresolvable_query",
            AnalystError::UpstreamUnavailable(_) | AnalystError::HttpError(_) => {
                "upstream_unavailable"
            }
            AnalystError::EmptySeries(_) => "empty_series",
            AnalystError::InsightUnavailable(_) => "insight_unavailable",
            AnalystError::InvalidQuery(_) => "invalid_query",
            AnalystError::Config(_) => "config",
            AnalystError::IoError(_) => "internal",
        }
    }

    /// User-visible message. Never carries upstream bodies or keys.
    pub fn user_message(&self) -> String {
        match self {
            AnalystError::UnresolvableQuery(_) => {
                "I can only analyze US economic data. Please ask about GDP, inflation, \
                 unemployment or interest rates."
                    .to_string()
            }
            AnalystError::UpstreamUnavailable(_) | AnalystError::HttpError(_) => {
                "The economic data service is unavailable right now. Please try again shortly."
                    .to_string()
            }
            AnalystError::EmptySeries(series_id) => format!(
                "I found the series '{}' but it has no data for the requested period.",
                series_id
            ),
            AnalystError::InsightUnavailable(_) => {
                "An AI explanation is unavailable right now.".to_string()
            }
            AnalystError::InvalidQuery(_) => "Please enter a valid query.".to_string(),
            AnalystError::Config(_) | AnalystError::IoError(_) => {
                "An internal error occurred.".to_string()
            }
        }
    }
}
