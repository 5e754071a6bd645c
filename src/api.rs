// src/api.rs
//
// HTTP front end: triggers collection runs, serves cached briefings, and
// exposes the connection pre-flight check. Exit semantics live in the
// briefing's overall_status, not in process exit codes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use tower_http::cors::{Any, CorsLayer};

use crate::briefing::{
    briefing_id, build_briefing, Briefing, BriefingStatus, BriefingSummary, DataSourceStatus,
    DigestSummarizer, Summarizer,
};
use crate::collect::{self, clients, config as source_config, status};
use crate::config::Settings;
use crate::store::{BriefingStore, MemoryStore};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    store: Arc<dyn BriefingStore>,
    summarizer: Arc<dyn Summarizer>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        store: Arc<dyn BriefingStore>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            store,
            summarizer,
        }
    }

    pub fn from_env() -> Self {
        Self::new(
            Settings::from_env(),
            Arc::new(MemoryStore::new()),
            Arc::new(DigestSummarizer),
        )
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings);
    Router::new()
        .route("/health", get(health))
        .route("/api/briefing/generate", post(generate_briefing))
        .route("/api/briefing/{date}", get(get_briefing))
        .route("/api/briefing/test/connections", get(test_connections))
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "daybrief",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    if origins.is_empty() {
        return CorsLayer::very_permissive();
    }
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[derive(Debug, serde::Serialize)]
struct ErrorBody {
    detail: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn bad_request(detail: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            detail: detail.into(),
        }),
    )
}

fn parse_date(s: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| bad_request(format!("Invalid date format. Use YYYY-MM-DD. Error: {e}")))
}

#[derive(Debug, Default, serde::Deserialize)]
struct GenerateParams {
    /// Date in YYYY-MM-DD format; defaults to today (UTC).
    date: Option<String>,
    #[serde(default)]
    include_raw_data: bool,
    /// Bypass the briefing cache and re-run collection.
    #[serde(default)]
    force: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct BriefingResponse {
    pub briefing: Briefing,
    pub message: String,
}

async fn generate_briefing(
    State(state): State<AppState>,
    Query(params): Query<GenerateParams>,
) -> Result<Json<BriefingResponse>, ApiError> {
    let date = match &params.date {
        Some(s) => parse_date(s)?,
        None => Utc::now().date_naive(),
    };
    let id = briefing_id(date);

    if !params.force {
        if let Some(cached) = state.store.get(&id) {
            tracing::info!(%id, "returning cached briefing");
            return Ok(Json(BriefingResponse {
                briefing: cached,
                message: "Briefing retrieved from cache".to_string(),
            }));
        }
    }

    tracing::info!(%date, "generating briefing");
    let started = Instant::now();

    let filter = match source_config::load_source_filter_default() {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable source filter");
            None
        }
    };
    let (source_clients, unconfigured) = clients::build_clients(&state.settings, filter.as_deref());

    let window = collect::types::FetchWindow::single_day(date);
    let data = collect::collect_all(
        window,
        source_clients,
        unconfigured,
        &state.settings.collector_cfg(),
    )
    .await
    .map_err(|e| bad_request(e.to_string()))?;

    if status::total_items(&data) == 0 {
        tracing::warn!(%date, "no data collected from any source");
        // Not cached on purpose: a later request should retry collection
        // once sources have data for the date.
        let briefing = Briefing {
            id,
            date,
            status: BriefingStatus::Completed,
            overall_status: status::overall_status(&data),
            summary: Some(BriefingSummary::default()),
            sections: vec![],
            generated_at: Utc::now(),
            processing_time_seconds: Some(started.elapsed().as_secs_f64()),
            data_sources: DataSourceStatus::from_collected(&data),
            raw_data: params.include_raw_data.then_some(data),
        };
        return Ok(Json(BriefingResponse {
            briefing,
            message: "No data available for this date".to_string(),
        }));
    }

    let (summary, sections) = state.summarizer.summarize(&data).await.map_err(|e| {
        tracing::error!(error = %e, "summarizer failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                detail: format!("Failed to generate briefing: {e}"),
            }),
        )
    })?;
    let briefing = build_briefing(
        date,
        data,
        summary,
        sections,
        started.elapsed().as_secs_f64(),
        params.include_raw_data,
    );

    state.store.put(briefing.clone());
    tracing::info!(%id, overall = %briefing.overall_status, "briefing generated");

    Ok(Json(BriefingResponse {
        briefing,
        message: "Briefing generated successfully".to_string(),
    }))
}

async fn get_briefing(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<BriefingResponse>, ApiError> {
    let parsed = parse_date(&date)?;
    let id = briefing_id(parsed);
    match state.store.get(&id) {
        Some(briefing) => Ok(Json(BriefingResponse {
            briefing,
            message: "Briefing retrieved successfully".to_string(),
        })),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                detail: format!(
                    "No briefing found for {date}. Generate one first using POST /api/briefing/generate"
                ),
            }),
        )),
    }
}

#[derive(Debug, serde::Serialize)]
struct ConnectionSummary {
    total: usize,
    connected: usize,
    failed: usize,
    not_configured: usize,
}

#[derive(Debug, serde::Serialize)]
struct ConnectionsResponse {
    timestamp: chrono::DateTime<Utc>,
    sources: BTreeMap<String, serde_json::Value>,
    summary: ConnectionSummary,
}

async fn test_connections(State(state): State<AppState>) -> Json<ConnectionsResponse> {
    let (source_clients, unconfigured) = clients::build_clients(&state.settings, None);

    let mut sources = BTreeMap::new();
    let mut connected = 0usize;
    let mut failed = 0usize;

    for client in &source_clients {
        let ok = client.test_connection().await;
        if ok {
            connected += 1;
        } else {
            failed += 1;
        }
        sources.insert(
            client.name().to_string(),
            serde_json::json!({ "connected": ok }),
        );
    }
    for (name, reason) in &unconfigured {
        sources.insert(
            name.to_string(),
            serde_json::json!({ "connected": false, "not_configured": true, "error": reason }),
        );
    }

    Json(ConnectionsResponse {
        timestamp: Utc::now(),
        sources,
        summary: ConnectionSummary {
            total: source_clients.len() + unconfigured.len(),
            connected,
            failed,
            not_configured: unconfigured.len(),
        },
    })
}
