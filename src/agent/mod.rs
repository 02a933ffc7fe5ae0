//! Request orchestrator
//!
//! RESOLVING → FETCHING → EXPLAINING → DONE, with ERRORED reachable from
//! the first two stages. Insight failures degrade instead of erroring.

use crate::catalog::{SeriesCatalog, SeriesId};
use crate::config::AppConfig;
use crate::error::AnalystError;
use crate::fetcher::{DataFetcher, FredClient, ObservationSource};
use crate::gemini::{GeminiClient, LanguageModel};
use crate::insight::{fallback_insight, InsightGenerator};
use crate::models::{AnalysisResponse, ChartPayload, Query, SeriesRecord, SeriesSpec, Stage};
use crate::refusal::{RefusalResponder, STATIC_REFUSAL};
use crate::resolver::SeriesResolver;
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// A request that ended in `Errored`.
#[derive(Debug)]
pub struct RequestFailure {
    pub request_id: Uuid,
    pub error: AnalystError,
    pub trace: Vec<Stage>,
    /// Polite refusal text, set for unresolvable queries only.
    pub refusal: Option<String>,
}

/// Per-request stage log
struct StageTrace {
    request_id: Uuid,
    stages: Vec<Stage>,
}

impl StageTrace {
    fn new(request_id: Uuid) -> Self {
        Self {
            request_id,
            stages: vec![Stage::Resolving],
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug!(request_id = %self.request_id, stage = %stage, "Stage transition");
        self.stages.push(stage);
    }

    fn fail(mut self, error: AnalystError, refusal: Option<String>) -> RequestFailure {
        let stage = Stage::Errored(error.kind());
        warn!(request_id = %self.request_id, stage = %stage, "Request aborted: {}", error);
        self.stages.push(stage);
        RequestFailure {
            request_id: self.request_id,
            error,
            trace: self.stages,
            refusal,
        }
    }
}

/// Main orchestrator that sequences the three stages
pub struct Orchestrator {
    catalog: Arc<SeriesCatalog>,
    resolver: SeriesResolver,
    fetcher: DataFetcher,
    insight: InsightGenerator,
    refusal: RefusalResponder,
}

impl Orchestrator {
    pub fn new(
        catalog: Arc<SeriesCatalog>,
        resolver: SeriesResolver,
        fetcher: DataFetcher,
        insight: InsightGenerator,
        refusal: RefusalResponder,
    ) -> Self {
        Self {
            catalog,
            resolver,
            fetcher,
            insight,
            refusal,
        }
    }

    /// Wire the pipeline to arbitrary upstreams.
    pub fn with_upstreams(
        config: &AppConfig,
        llm: Arc<dyn LanguageModel>,
        source: Arc<dyn ObservationSource>,
    ) -> Self {
        Self::new(
            config.catalog.clone(),
            SeriesResolver::new(llm.clone(), config.catalog.clone()),
            DataFetcher::new(source, config.lookback_years),
            InsightGenerator::new(llm.clone()),
            RefusalResponder::new(llm),
        )
    }

    /// Production wiring: Gemini for both LLM stages, FRED for data.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let llm: Arc<dyn LanguageModel> = Arc::new(GeminiClient::from_config(config)?);
        let source: Arc<dyn ObservationSource> = Arc::new(FredClient::from_config(config)?);
        Ok(Self::with_upstreams(config, llm, source))
    }

    pub fn catalog(&self) -> &SeriesCatalog {
        &self.catalog
    }

    /// Run one request through the pipeline.
    pub async fn run(&self, query: &Query) -> std::result::Result<AnalysisResponse, RequestFailure> {
        let start_time = Instant::now();
        let request_id = Uuid::new_v4();
        let mut trace = StageTrace::new(request_id);

        info!(request_id = %request_id, query = %query.as_str(), "Orchestrator: request received");

        // === RESOLVING ===
        let spec = match self.resolver.resolve(query).await {
            Ok(spec) => spec,
            Err(AnalystError::UnresolvableQuery(reason)) => {
                let refusal = self.refusal.respond(query).await;
                return Err(trace.fail(AnalystError::UnresolvableQuery(reason), Some(refusal)));
            }
            Err(e) => {
                // The model itself is down: asking it for a refusal would fail too.
                error!(request_id = %request_id, "Language model unavailable while resolving: {}", e);
                return Err(trace.fail(
                    AnalystError::UnresolvableQuery("language model unavailable".to_string()),
                    Some(STATIC_REFUSAL.to_string()),
                ));
            }
        };

        // === FETCHING ===
        trace.enter(Stage::Fetching);
        let record = match self.fetcher.fetch(&spec).await {
            Ok(record) => record,
            Err(e) => return Err(trace.fail(e, None)),
        };

        // === EXPLAINING ===
        trace.enter(Stage::Explaining);
        let insight = match self.insight.explain(query, &record).await {
            Ok(insight) => insight,
            Err(e) => {
                warn!(request_id = %request_id, "Degrading to fallback insight: {}", e);
                fallback_insight(&record)
            }
        };

        trace.enter(Stage::Done);

        info!(
            request_id = %request_id,
            series_id = %record.series_id,
            observations = record.observations.len(),
            insight_available = insight.available,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Orchestrator: request complete"
        );

        Ok(AnalysisResponse {
            request_id,
            query: query.as_str().to_string(),
            chart: ChartPayload::from_record(&record),
            source_url: record.source_url.clone(),
            export_url: export_url(&spec),
            series: record,
            insight,
            trace: trace.stages,
        })
    }

    /// Fetch stage alone, for exports of an already-validated series.
    pub async fn fetch_series(&self, spec: &SeriesSpec) -> Result<SeriesRecord> {
        self.fetcher.fetch(spec).await
    }
}

/// Relative link to the CSV export of the resolved series.
pub fn export_url(spec: &SeriesSpec) -> String {
    let mut params = Vec::new();
    if let Some(start) = spec.start {
        params.push(format!("start={}", start.format("%Y-%m-%d")));
    }
    if let Some(end) = spec.end {
        params.push(format!("end={}", end.format("%Y-%m-%d")));
    }
    export_path(&spec.series_id, &params)
}

fn export_path(series_id: &SeriesId, params: &[String]) -> String {
    if params.is_empty() {
        format!("/api/export/{}", series_id)
    } else {
        format!("/api/export/{}?{}", series_id, params.join("&"))
    }
}
