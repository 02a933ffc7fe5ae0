//! Data fetcher
//!
//! Turns a validated [`SeriesSpec`] into a normalised [`SeriesRecord`].
//! The wire client sits behind [`ObservationSource`] so the normalisation
//! rules can run against fixed data.

use crate::catalog::SeriesId;
use crate::error::AnalystError;
use crate::models::{Observation, SeriesRecord, SeriesSpec};
use crate::Result;
use async_trait::async_trait;
use chrono::{Months, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

pub mod fred;
pub use fred::FredClient;

/// FRED marks withheld or missing observations with this value.
pub const MISSING_VALUE_SENTINEL: &str = ".";

/// One observation as it comes off the wire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawObservation {
    pub date: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeriesInfo {
    pub title: String,
    pub units: String,
    #[serde(default)]
    pub frequency: Option<String>,
}

/// Trait for the economic-data API
#[async_trait]
pub trait ObservationSource: Send + Sync {
    async fn observations(
        &self,
        series_id: &SeriesId,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<RawObservation>>;

    async fn series_info(&self, series_id: &SeriesId) -> Result<SeriesInfo>;
}

pub struct DataFetcher {
    source: Arc<dyn ObservationSource>,
    lookback_years: u32,
}

impl DataFetcher {
    pub fn new(source: Arc<dyn ObservationSource>, lookback_years: u32) -> Self {
        Self {
            source,
            lookback_years,
        }
    }

    /// Single attempt; failures surface to the caller.
    pub async fn fetch(&self, spec: &SeriesSpec) -> Result<SeriesRecord> {
        let start = spec.start.or_else(|| self.default_start(spec.end));

        let raw = self
            .source
            .observations(&spec.series_id, start, spec.end)
            .await?;
        let fetched = raw.len();

        let observations = normalize(raw);

        debug!(
            series_id = %spec.series_id,
            fetched,
            usable = observations.len(),
            "Observations normalised"
        );

        if observations.is_empty() {
            return Err(AnalystError::EmptySeries(spec.series_id.to_string()));
        }

        let info = match self.source.series_info(&spec.series_id).await {
            Ok(info) => info,
            Err(e) => {
                warn!(series_id = %spec.series_id, "Series metadata unavailable: {}", e);
                SeriesInfo {
                    title: spec.series_id.to_string(),
                    units: "Value".to_string(),
                    frequency: None,
                }
            }
        };

        Ok(SeriesRecord {
            source_url: spec.series_id.source_url(),
            series_id: spec.series_id.clone(),
            title: info.title,
            units: info.units,
            frequency: info.frequency,
            observations,
        })
    }

    /// Lookback window ending at `end`, or at today when the range is open.
    fn default_start(&self, end: Option<NaiveDate>) -> Option<NaiveDate> {
        end.unwrap_or_else(|| Utc::now().date_naive())
            .checked_sub_months(Months::new(self.lookback_years.saturating_mul(12)))
    }
}

/// Drop sentinel and unparsable points, parse dates, order ascending.
pub fn normalize(raw: Vec<RawObservation>) -> Vec<Observation> {
    let mut observations: Vec<Observation> = raw
        .into_iter()
        .filter_map(|r| {
            let value = r.value.trim();
            if value == MISSING_VALUE_SENTINEL {
                return None;
            }
            let value: f64 = value.parse().ok().filter(|v: &f64| v.is_finite())?;
            let date = NaiveDate::parse_from_str(r.date.trim(), "%Y-%m-%d").ok()?;
            Some(Observation { date, value })
        })
        .collect();

    observations.sort_by_key(|o| o.date);
    observations
}
