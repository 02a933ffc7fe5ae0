//! Gemini API client
//!
//! Both LLM stages (resolution and insight) go through [`LanguageModel`];
//! [`GeminiClient`] is the production implementation and uses a long-lived
//! reqwest::Client for connection pooling.

use crate::config::AppConfig;
use crate::error::AnalystError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// Seam for the completion API
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one completion. `system` carries the instruction set, `prompt` the task.
    async fn generate(
        &self,
        system: &str,
        prompt: &str,
        options: GenerationOptions,
    ) -> crate::Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_output_tokens: i32,
}

impl GenerationOptions {
    /// Near-deterministic, short output for classification.
    pub const CLASSIFY: Self = Self {
        temperature: 0.0,
        max_output_tokens: 128,
    };

    pub const EXPLAIN: Self = Self {
        temperature: 0.3,
        max_output_tokens: 1024,
    };
}

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: &str, model: &str, timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!(
                "{}/models/{}:generateContent",
                base_url.trim_end_matches('/'),
                model
            ),
        })
    }

    pub fn from_config(config: &AppConfig) -> crate::Result<Self> {
        Self::new(
            config.gemini_api_key.clone(),
            &config.gemini_base_url,
            &config.gemini_model,
            config.http_timeout,
        )
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(
        &self,
        system: &str,
        prompt: &str,
        options: GenerationOptions,
    ) -> crate::Result<String> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: options.temperature,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: options.max_output_tokens,
            },
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: system.to_string(),
                }],
            },
        };

        debug!("Calling Gemini API");

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!("Gemini API request failed: {}", e);
                AnalystError::UpstreamUnavailable(format!("Gemini API error: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Gemini API error response: {}", error_text);
            return Err(AnalystError::UpstreamUnavailable(format!(
                "Gemini API returned {}",
                status
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e.without_url());
            AnalystError::UpstreamUnavailable("Gemini response could not be decoded".to_string())
        })?;

        let text = extract_text(&gemini_response).ok_or_else(|| {
            AnalystError::UpstreamUnavailable("Empty response from Gemini".to_string())
        })?;

        debug!(
            finish_reason = ?gemini_response.candidates.first().and_then(|c| c.finish_reason.as_deref()),
            "Gemini response received"
        );

        Ok(text)
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: &GeminiResponse) -> Option<String> {
    let candidate = response.candidates.first()?;
    let text: String = candidate
        .content
        .as_ref()?
        .parts
        .iter()
        .map(|p| p.text.as_str())
        .collect();

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "30-year mortgage rate".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 128,
            },
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: "You are a strict classification engine".to_string(),
                }],
            },
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("30-year mortgage rate"));
        assert!(json.contains("system_instruction"));
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GeminiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"series_id\":" }, { "text": " \"UNRATE\"}" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 10 }
        }))
        .unwrap();

        assert_eq!(
            extract_text(&response).as_deref(),
            Some("{\"series_id\": \"UNRATE\"}")
        );
        assert_eq!(response.candidates[0].finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn test_blocked_response_has_no_text() {
        let response: GeminiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();
        assert!(extract_text(&response).is_none());

        let response: GeminiResponse =
            serde_json::from_value(serde_json::json!({ "promptFeedback": {} })).unwrap();
        assert!(extract_text(&response).is_none());
    }

    #[test]
    fn test_endpoint_includes_model() {
        let client = GeminiClient::new(
            "k".into(),
            "https://generativelanguage.googleapis.com/v1beta/",
            "gemini-2.0-flash",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.endpoint,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
