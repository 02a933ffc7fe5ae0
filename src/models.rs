//! Core data models for the analyst pipeline

use crate::catalog::SeriesId;
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Query =================
//

/// Raw user question, trimmed and known to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//
// ================= Series =================
//

/// Output of the resolver, input of the fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesSpec {
    pub series_id: SeriesId,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

/// A normalised series. Observations are ascending by date and never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesRecord {
    pub series_id: SeriesId,
    pub title: String,
    pub units: String,
    pub frequency: Option<String>,
    pub source_url: String,
    pub observations: Vec<Observation>,
}

impl SeriesRecord {
    pub fn first(&self) -> Option<&Observation> {
        self.observations.first()
    }

    pub fn latest(&self) -> Option<&Observation> {
        self.observations.last()
    }

    /// Compact description of the series for prompting.
    pub fn summarize(&self) -> Option<SeriesSummary> {
        let first = *self.observations.first()?;
        let last = *self.observations.last()?;

        let min = *self
            .observations
            .iter()
            .min_by(|a, b| a.value.total_cmp(&b.value))?;
        let max = *self
            .observations
            .iter()
            .max_by(|a, b| a.value.total_cmp(&b.value))?;

        let year_ago = last
            .date
            .checked_sub_months(Months::new(12))
            .and_then(|target| {
                self.observations
                    .iter()
                    .rev()
                    .find(|o| o.date <= target)
                    .copied()
            });

        let change_vs_year_ago = year_ago.map(|o| last.value - o.value);
        let trend = match change_vs_year_ago {
            Some(diff) => Trend::from_change(diff),
            None => Trend::from_change(last.value - first.value),
        };

        Some(SeriesSummary {
            count: self.observations.len(),
            first,
            last,
            min,
            max,
            year_ago,
            change_vs_year_ago,
            trend,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    fn from_change(diff: f64) -> Self {
        if diff > f64::EPSILON {
            Trend::Up
        } else if diff < -f64::EPSILON {
            Trend::Down
        } else {
            Trend::Flat
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub count: usize,
    pub first: Observation,
    pub last: Observation,
    pub min: Observation,
    pub max: Observation,
    pub year_ago: Option<Observation>,
    pub change_vs_year_ago: Option<f64>,
    pub trend: Trend,
}

impl SeriesSummary {
    /// One-sentence trend context, in the wording the insight prompt expects.
    pub fn trend_description(&self) -> String {
        match self.change_vs_year_ago {
            Some(_) if self.trend == Trend::Flat => {
                "The value is unchanged from one year ago.".to_string()
            }
            Some(diff) => format!(
                "The value is {} by {:.2} compared to one year ago.",
                self.trend,
                diff.abs()
            ),
            None => "Insufficient data to calculate annual trend.".to_string(),
        }
    }
}

//
// ================= Insight =================
//

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub text: String,
    /// False when the text is the fallback notice rather than model output.
    pub available: bool,
}

//
// ================= Chart =================
//

#[derive(Debug, Clone, Serialize)]
pub struct ChartPayload {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<f64>,
    pub border_color: &'static str,
    pub background_color: &'static str,
    pub border_width: u8,
    pub point_radius: u8,
    pub point_hover_radius: u8,
    pub fill: bool,
    pub tension: f32,
}

impl ChartPayload {
    pub fn from_record(record: &SeriesRecord) -> Self {
        let (labels, data): (Vec<String>, Vec<f64>) = record
            .observations
            .iter()
            .map(|o| (o.date.format("%Y-%m-%d").to_string(), o.value))
            .unzip();

        Self {
            labels,
            datasets: vec![ChartDataset {
                label: record.title.clone(),
                data,
                border_color: "#2563eb",
                background_color: "rgba(37, 99, 235, 0.1)",
                border_width: 2,
                point_radius: 0,
                point_hover_radius: 4,
                fill: true,
                tension: 0.4,
            }],
        }
    }
}

//
// ================= Pipeline State =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Resolving,
    Fetching,
    Explaining,
    Done,
    Errored(&'static str),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Resolving => write!(f, "resolving"),
            Stage::Fetching => write!(f, "fetching"),
            Stage::Explaining => write!(f, "explaining"),
            Stage::Done => write!(f, "done"),
            Stage::Errored(kind) => write!(f, "errored({})", kind),
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Flat => "flat",
        };
        write!(f, "{}", s)
    }
}

//
// ================= Final Result =================
//

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub request_id: Uuid,
    pub query: String,
    pub series: SeriesRecord,
    pub chart: ChartPayload,
    pub insight: Insight,
    pub source_url: String,
    pub export_url: String,
    pub trace: Vec<Stage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SeriesCatalog;

    fn obs(date: &str, value: f64) -> Observation {
        Observation {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            value,
        }
    }

    fn record(observations: Vec<Observation>) -> SeriesRecord {
        let id = SeriesCatalog::default().lookup("UNRATE").unwrap();
        SeriesRecord {
            source_url: id.source_url(),
            series_id: id,
            title: "Unemployment Rate".into(),
            units: "Percent".into(),
            frequency: Some("Monthly".into()),
            observations,
        }
    }

    #[test]
    fn test_query_rejects_blank() {
        assert!(Query::parse("   ").is_none());
        assert_eq!(Query::parse("  unemployment ").unwrap().as_str(), "unemployment");
    }

    #[test]
    fn test_summary_year_over_year() {
        let mut points = Vec::new();
        for month in 1..=12 {
            points.push(obs(&format!("2023-{:02}-01", month), 3.0 + month as f64 * 0.1));
        }
        points.push(obs("2024-01-01", 4.0));

        let summary = record(points).summarize().unwrap();
        assert_eq!(summary.count, 13);
        assert_eq!(summary.year_ago.unwrap().date, obs("2023-01-01", 0.0).date);
        assert_eq!(summary.trend, Trend::Up);
        assert!((summary.max.value - 4.2).abs() < 1e-9);
        assert_eq!(summary.last.value, 4.0);
        assert!((summary.min.value - 3.1).abs() < 1e-9);
        assert_eq!(
            summary.trend_description(),
            "The value is up by 0.90 compared to one year ago."
        );
    }

    #[test]
    fn test_summary_short_series() {
        let summary = record(vec![obs("2024-01-01", 5.0), obs("2024-02-01", 4.5)])
            .summarize()
            .unwrap();
        assert!(summary.year_ago.is_none());
        assert_eq!(summary.trend, Trend::Down);
        assert_eq!(
            summary.trend_description(),
            "Insufficient data to calculate annual trend."
        );
    }

    #[test]
    fn test_summary_flat_year() {
        let summary = record(vec![
            obs("2023-01-01", 5.25),
            obs("2023-07-01", 5.5),
            obs("2024-01-01", 5.25),
        ])
        .summarize()
        .unwrap();
        assert_eq!(summary.trend, Trend::Flat);
        assert_eq!(
            summary.trend_description(),
            "The value is unchanged from one year ago."
        );
    }

    #[test]
    fn test_chart_payload_shape() {
        let chart = ChartPayload::from_record(&record(vec![
            obs("2024-01-01", 3.7),
            obs("2024-02-01", 3.9),
        ]));
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["labels"][1], "2024-02-01");
        assert_eq!(json["datasets"][0]["borderColor"], "#2563eb");
        assert_eq!(json["datasets"][0]["data"][0], 3.7);
    }
}
