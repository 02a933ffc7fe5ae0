//! Insight generator
//!
//! Second LLM call of a request. Prompts with a summary of the series rather
//! than every point, which keeps the prompt size independent of the range.

use crate::error::AnalystError;
use crate::gemini::{GenerationOptions, LanguageModel};
use crate::models::{Insight, Query, SeriesRecord, SeriesSummary};
use crate::Result;
use std::sync::Arc;
use tracing::debug;

const SYSTEM_PROMPT: &str = r#"You are a professional Economic Analyst.
You retrieve data and explain it. You DO NOT generate creative fiction, code, or opinions unrelated to economics.

RESPONSE GUIDELINES:
1. Direct Answer: State the latest data point clearly first.
2. Explanation: Explain what this metric actually measures (briefly).
3. The "Why": Explain WHY the data might look this way. Mention relevant recent economic events, Fed policy, or historical seasonality that explains the current trend.
4. Tone: Professional, objective, and concise (max 4-5 sentences)."#;

pub struct InsightGenerator {
    llm: Arc<dyn LanguageModel>,
}

impl InsightGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Fails with `InsightUnavailable`; callers decide how to degrade.
    pub async fn explain(&self, query: &Query, record: &SeriesRecord) -> Result<Insight> {
        let summary = record.summarize().ok_or_else(|| {
            AnalystError::InsightUnavailable("series has no observations".to_string())
        })?;

        let prompt = build_prompt(query, record, &summary);

        let text = self
            .llm
            .generate(SYSTEM_PROMPT, &prompt, GenerationOptions::EXPLAIN)
            .await
            .map_err(|e| AnalystError::InsightUnavailable(e.to_string()))?;

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(AnalystError::InsightUnavailable(
                "model returned no text".to_string(),
            ));
        }

        debug!(series_id = %record.series_id, chars = text.len(), "Insight generated");

        Ok(Insight {
            text,
            available: true,
        })
    }
}

/// Notice shown in place of the explanation when the model is unavailable.
pub fn fallback_insight(record: &SeriesRecord) -> Insight {
    let text = match record.latest() {
        Some(latest) => format!(
            "The current value for {} is {} {} (as of {}). An AI explanation is unavailable right now.",
            record.title, latest.value, record.units, latest.date
        ),
        None => "An AI explanation is unavailable right now.".to_string(),
    };

    Insight {
        text,
        available: false,
    }
}

fn build_prompt(query: &Query, record: &SeriesRecord, summary: &SeriesSummary) -> String {
    format!(
        r#"TASK: Analyze the following FRED data in response to the user's question.

USER QUESTION: "{question}"

DATA CONTEXT:
- Series: {title} ({id})
- Units: {units}
- Frequency: {frequency}
- Latest Value: {last_value} {units}
- Date of Report: {last_date}
- Range Covered: {first_date} to {last_date} ({count} observations)
- Low: {min_value} on {min_date}
- High: {max_value} on {max_date}
- Trend Context: {trend}"#,
        question = query.as_str(),
        title = record.title,
        id = record.series_id,
        units = record.units,
        frequency = record.frequency.as_deref().unwrap_or("unknown"),
        last_value = summary.last.value,
        last_date = summary.last.date,
        first_date = summary.first.date,
        count = summary.count,
        min_value = summary.min.value,
        min_date = summary.min.date,
        max_value = summary.max.value,
        max_date = summary.max.date,
        trend = summary.trend_description(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SeriesCatalog;
    use crate::models::Observation;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    struct RecordingModel {
        reply: crate::Result<String>,
        last_prompt: Mutex<String>,
    }

    #[async_trait]
    impl LanguageModel for RecordingModel {
        async fn generate(
            &self,
            _system: &str,
            prompt: &str,
            _options: GenerationOptions,
        ) -> crate::Result<String> {
            *self.last_prompt.lock().unwrap() = prompt.to_string();
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(AnalystError::UpstreamUnavailable(e.to_string())),
            }
        }
    }

    fn record(points: usize) -> SeriesRecord {
        let id = SeriesCatalog::default().lookup("UNRATE").unwrap();
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        SeriesRecord {
            source_url: id.source_url(),
            series_id: id,
            title: "Unemployment Rate".into(),
            units: "Percent".into(),
            frequency: Some("Monthly".into()),
            observations: (0..points)
                .map(|i| Observation {
                    date: start + chrono::Days::new(i as u64 * 30),
                    value: 3.5 + (i % 7) as f64 * 0.1,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_prompt_is_summarised() {
        let model = Arc::new(RecordingModel {
            reply: Ok("  Unemployment is 3.9%.  ".into()),
            last_prompt: Mutex::new(String::new()),
        });
        let generator = InsightGenerator::new(model.clone());
        let record = record(500);

        let insight = generator
            .explain(&Query::parse("how is unemployment?").unwrap(), &record)
            .await
            .unwrap();
        assert_eq!(insight.text, "Unemployment is 3.9%.");
        assert!(insight.available);

        let prompt = model.last_prompt.lock().unwrap().clone();
        assert!(prompt.contains("USER QUESTION: \"how is unemployment?\""));
        assert!(prompt.contains("500 observations"));
        // bounded: not one line per point
        assert!(prompt.lines().count() < 20);
    }

    #[tokio::test]
    async fn test_model_failure_is_insight_unavailable() {
        let model = Arc::new(RecordingModel {
            reply: Err(AnalystError::UpstreamUnavailable("timeout".into())),
            last_prompt: Mutex::new(String::new()),
        });
        let err = InsightGenerator::new(model)
            .explain(&Query::parse("gdp").unwrap(), &record(3))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "insight_unavailable");
    }

    #[tokio::test]
    async fn test_blank_text_is_insight_unavailable() {
        let model = Arc::new(RecordingModel {
            reply: Ok("   ".into()),
            last_prompt: Mutex::new(String::new()),
        });
        let err = InsightGenerator::new(model)
            .explain(&Query::parse("gdp").unwrap(), &record(3))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalystError::InsightUnavailable(_)));
    }

    #[test]
    fn test_fallback_names_latest_value() {
        let insight = fallback_insight(&record(2));
        assert!(!insight.available);
        assert!(insight.text.starts_with("The current value for Unemployment Rate is 3.6 Percent"));
    }
}
