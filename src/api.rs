//! REST API Server for the FRED analyst
//!
//! Exposes the orchestrator via HTTP endpoints
//! and serves the single-page chart UI

use axum::extract::{Path, Query as QueryParams, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::agent::{Orchestrator, RequestFailure};
use crate::error::AnalystError;
use crate::export;
use crate::models::{Query, SeriesSpec};

const INDEX_HTML: &str = include_str!("../static/index.html");

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl ExportRequest {
    /// Validated `(start, end)` bounds, `YYYY-MM-DD`, start not after end.
    pub fn range(&self) -> Result<(Option<NaiveDate>, Option<NaiveDate>), AnalystError> {
        let start = parse_date_param("start", self.start.as_deref())?;
        let end = parse_date_param("end", self.end.as_deref())?;
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(AnalystError::InvalidQuery("start is after end".into()));
            }
        }
        Ok((start, end))
    }
}

fn parse_date_param(name: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, AnalystError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AnalystError::InvalidQuery(format!("{} must be YYYY-MM-DD, got {}", name, s))),
    }
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String, data: Option<serde_json::Value>) -> Self {
        Self {
            success: false,
            data,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn from_error(err: &AnalystError) -> Self {
        Self::error(err.user_message(), Some(serde_json::json!({ "kind": err.kind() })))
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
}

fn status_for(err: &AnalystError) -> StatusCode {
    match err {
        AnalystError::UnresolvableQuery(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AnalystError::EmptySeries(_) => StatusCode::NOT_FOUND,
        AnalystError::UpstreamUnavailable(_) | AnalystError::HttpError(_) => StatusCode::BAD_GATEWAY,
        AnalystError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// =============================
/// UI + Health
/// =============================

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Analysis Endpoints
/// =============================

async fn analyze(state: &ApiState, raw: &str) -> (StatusCode, Json<ApiResponse>) {
    let Some(query) = Query::parse(raw) else {
        let err = AnalystError::InvalidQuery("empty query".into());
        return (status_for(&err), Json(ApiResponse::from_error(&err)));
    };

    match state.orchestrator.run(&query).await {
        Ok(response) => (StatusCode::OK, Json(ApiResponse::success(response))),
        Err(failure) => failure_response(failure),
    }
}

fn failure_response(failure: RequestFailure) -> (StatusCode, Json<ApiResponse>) {
    let RequestFailure {
        request_id,
        error,
        trace,
        refusal,
    } = failure;

    let mut data = serde_json::json!({
        "kind": error.kind(),
        "request_id": request_id,
        "trace": trace,
    });
    if let Some(text) = refusal {
        data["response"] = serde_json::json!(text);
    }

    (
        status_for(&error),
        Json(ApiResponse::error(error.user_message(), Some(data))),
    )
}

async fn chat_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    info!("Received chat request");
    analyze(&state, &req.message).await
}

async fn query_handler(
    State(state): State<ApiState>,
    QueryParams(req): QueryParams<QueryRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    info!("Received query request");
    analyze(&state, &req.q).await
}

/// =============================
/// Export Endpoint
/// =============================

async fn export_handler(
    State(state): State<ApiState>,
    Path(series_id): Path<String>,
    QueryParams(req): QueryParams<ExportRequest>,
) -> Response {
    let Some(series_id) = state.orchestrator.catalog().lookup(&series_id) else {
        let err = AnalystError::UnresolvableQuery(format!("{} is not an allowed series", series_id));
        return (StatusCode::NOT_FOUND, Json(ApiResponse::from_error(&err))).into_response();
    };

    let (start, end) = match req.range() {
        Ok(range) => range,
        Err(err) => {
            return (StatusCode::BAD_REQUEST, Json(ApiResponse::from_error(&err))).into_response();
        }
    };

    let spec = SeriesSpec {
        series_id,
        start,
        end,
    };

    let record = match state.orchestrator.fetch_series(&spec).await {
        Ok(record) => record,
        Err(err) => {
            return (status_for(&err), Json(ApiResponse::from_error(&err))).into_response();
        }
    };

    match export::to_csv(&record) {
        Ok(body) => (
            [
                (header::CONTENT_TYPE, export::CSV_CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", export::file_name(&record)),
                ),
            ],
            body,
        )
            .into_response(),
        Err(err) => {
            error!("CSV export failed: {}", err);
            (status_for(&err), Json(ApiResponse::from_error(&err))).into_response()
        }
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = ApiState { orchestrator };

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/chat", post(chat_handler))
        .route("/api/query", get(query_handler))
        .route("/api/export/:series_id", get(export_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Arc<Orchestrator>,
    bind_addr: &str,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(orchestrator);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", bind_addr, port)).await?;

    info!("API Server listening on http://{}:{}", bind_addr, port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
