//! Process-wide configuration
//!
//! Built once at startup from the environment (`.env` honoured) and shared
//! read-only with every component.

use crate::catalog::SeriesCatalog;
use crate::error::AnalystError;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_FRED_BASE_URL: &str = "https://api.stlouisfed.org/fred";

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOOKBACK_YEARS: u32 = 10;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: String,
    pub fred_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub fred_base_url: String,
    pub bind_addr: String,
    pub port: u16,
    pub http_timeout: Duration,
    pub lookback_years: u32,
    pub catalog: Arc<SeriesCatalog>,
}

impl AppConfig {
    /// Config with defaults for everything but the two keys.
    pub fn new(gemini_api_key: impl Into<String>, fred_api_key: impl Into<String>) -> Self {
        Self {
            gemini_api_key: gemini_api_key.into(),
            fred_api_key: fred_api_key.into(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            fred_base_url: DEFAULT_FRED_BASE_URL.to_string(),
            bind_addr: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            lookback_years: DEFAULT_LOOKBACK_YEARS,
            catalog: Arc::new(SeriesCatalog::default()),
        }
    }

    /// Load from the process environment. Fails fast when either key is missing.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup, so tests never touch the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AnalystError::Config(format!("{} is not set", name)))
        };

        let mut config = Self::new(required("GEMINI_API_KEY")?, required("FRED_API_KEY")?);

        if let Some(model) = lookup("GEMINI_MODEL").filter(|v| !v.trim().is_empty()) {
            config.gemini_model = model.trim().to_string();
        }
        if let Some(url) = lookup("GEMINI_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config.gemini_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(url) = lookup("FRED_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config.fred_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(addr) = lookup("BIND_ADDR").filter(|v| !v.trim().is_empty()) {
            config.bind_addr = addr.trim().to_string();
        }

        let port = lookup("PORT")
            .map(|v| ("PORT", v))
            .or_else(|| lookup("API_PORT").map(|v| ("API_PORT", v)));
        if let Some((name, port)) = port {
            config.port = parse_var(name, &port)?;
        }
        if let Some(secs) = lookup("HTTP_TIMEOUT_SECS") {
            let secs: u64 = parse_var("HTTP_TIMEOUT_SECS", &secs)?;
            if secs == 0 {
                return Err(AnalystError::Config(
                    "HTTP_TIMEOUT_SECS must be at least 1".to_string(),
                ));
            }
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(years) = lookup("LOOKBACK_YEARS") {
            config.lookback_years = parse_var("LOOKBACK_YEARS", &years)?;
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| AnalystError::Config(format!("{} has an invalid value: {}", name, raw)))
}
