//! FRED API client
//!
//! Wraps `fred/series/observations` and `fred/series`. The API key travels
//! as a query parameter, so reqwest errors are stripped of their URL before
//! they are logged or wrapped.

use super::{ObservationSource, RawObservation, SeriesInfo};
use crate::catalog::SeriesId;
use crate::config::AppConfig;
use crate::error::AnalystError;
use crate::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

#[derive(Clone)]
pub struct FredClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FredClient {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            config.fred_api_key.clone(),
            &config.fred_base_url,
            config.http_timeout,
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(url)
            .query(&[("api_key", self.api_key.as_str()), ("file_type", "json")])
            .query(params)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!("FRED request failed for {}: {}", path, e);
                AnalystError::UpstreamUnavailable(format!("FRED request failed for {}: {}", path, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .json::<FredErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error_message)
                .unwrap_or_default();
            error!(%status, "FRED returned an error for {}: {}", path, body);
            return Err(AnalystError::UpstreamUnavailable(format!(
                "FRED returned {} for {}",
                status, path
            )));
        }

        response.json::<T>().await.map_err(|e| {
            AnalystError::UpstreamUnavailable(format!(
                "Invalid FRED response for {}: {}",
                path,
                e.without_url()
            ))
        })
    }
}

#[async_trait]
impl ObservationSource for FredClient {
    async fn observations(
        &self,
        series_id: &SeriesId,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<RawObservation>> {
        let mut params = vec![("series_id", series_id.to_string())];
        if let Some(start) = start {
            params.push(("observation_start", start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = end {
            params.push(("observation_end", end.format("%Y-%m-%d").to_string()));
        }

        let body: ObservationsResponse = self.get_json("/series/observations", &params).await?;
        debug!(series_id = %series_id, count = body.observations.len(), "FRED observations received");

        Ok(body.observations)
    }

    async fn series_info(&self, series_id: &SeriesId) -> Result<SeriesInfo> {
        let body: SeriesResponse = self
            .get_json("/series", &[("series_id", series_id.to_string())])
            .await?;

        body.seriess.into_iter().next().ok_or_else(|| {
            AnalystError::UpstreamUnavailable(format!("FRED has no metadata for {}", series_id))
        })
    }
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    #[serde(default)]
    seriess: Vec<SeriesInfo>,
}

#[derive(Debug, Deserialize)]
struct FredErrorBody {
    error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SeriesCatalog;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn observations(Query(params): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
        if params.get("api_key").map(String::as_str) != Some("test-key") {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error_code": 400, "error_message": "Bad Request. The value for variable api_key is not registered." })),
            );
        }
        if params.get("series_id").map(String::as_str) != Some("MORTGAGE30US") {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error_code": 400 })));
        }
        (
            StatusCode::OK,
            Json(json!({
                "observation_start": params.get("observation_start"),
                "observations": [
                    { "realtime_start": "2024-06-01", "realtime_end": "2024-06-01", "date": "2024-01-04", "value": "6.62" },
                    { "realtime_start": "2024-06-01", "realtime_end": "2024-06-01", "date": "2024-01-11", "value": "." }
                ]
            })),
        )
    }

    async fn series() -> Json<Value> {
        Json(json!({
            "seriess": [{
                "id": "MORTGAGE30US",
                "title": "30-Year Fixed Rate Mortgage Average in the United States",
                "frequency": "Weekly, Ending Thursday",
                "units": "Percent"
            }]
        }))
    }

    async fn spawn_fake_fred() -> String {
        let router = Router::new()
            .route("/fred/series/observations", get(observations))
            .route("/fred/series", get(series));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/fred", addr)
    }

    fn mortgage() -> SeriesId {
        SeriesCatalog::default().lookup("MORTGAGE30US").unwrap()
    }

    #[tokio::test]
    async fn test_fetches_observations_and_metadata() {
        let base = spawn_fake_fred().await;
        let client = FredClient::new("test-key".into(), &base, Duration::from_secs(5)).unwrap();

        let raw = client
            .observations(&mortgage(), NaiveDate::from_ymd_opt(2024, 1, 1), None)
            .await
            .unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[1].value, ".");

        let info = client.series_info(&mortgage()).await.unwrap();
        assert_eq!(info.units, "Percent");
        assert_eq!(info.frequency.as_deref(), Some("Weekly, Ending Thursday"));
    }

    #[tokio::test]
    async fn test_http_error_is_upstream_unavailable() {
        let base = spawn_fake_fred().await;
        let client = FredClient::new("wrong-key".into(), &base, Duration::from_secs(5)).unwrap();

        let err = client.observations(&mortgage(), None, None).await.unwrap_err();
        assert_eq!(err.kind(), "upstream_unavailable");
        assert!(!err.to_string().contains("wrong-key"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_upstream_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = FredClient::new(
            "secret-key".into(),
            &format!("http://{}/fred", addr),
            Duration::from_secs(2),
        )
        .unwrap();
        let err = client.observations(&mortgage(), None, None).await.unwrap_err();
        assert!(matches!(err, AnalystError::UpstreamUnavailable(_)));
        assert!(!err.to_string().contains("secret-key"));
    }
}
