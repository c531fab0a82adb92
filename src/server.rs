//! Web server module for periscope.
//!
//! Exposes the sample registry over a JSON REST API: declare and remove
//! sets, list them, and read their retained windows by count, cutoff
//! timestamp, or trailing range, optionally projected onto `(x, y)` series
//! points with a JSON path query.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::config::parse_duration;
use crate::extract::extract_series;
use crate::sampler::{Sample, SampleRegistry, SampleSetConfig, SamplerError};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: SampleRegistry,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

/// Query parameters for window read endpoints.
#[derive(Debug, Deserialize)]
pub struct ReadQueryParams {
    /// JSON path projecting each sample onto a numeric series value.
    pub path: Option<String>,
}

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    let app_state = Arc::new(state);

    Router::new()
        .route("/healthz", get(healthz_handler))
        .route(
            "/api/samples",
            post(create_sample_set_handler).get(list_sample_sets_handler),
        )
        .route("/api/samples/:name", delete(delete_sample_set_handler))
        .route("/api/samples/:name/count/:count", get(read_count_handler))
        .route(
            "/api/samples/:name/since/:timestamp",
            get(read_since_handler),
        )
        .route("/api/samples/:name/range/:range", get(read_range_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// Liveness probe.
async fn healthz_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Declare a new sample set and start polling it.
async fn create_sample_set_handler(
    State(state): State<Arc<AppState>>,
    Json(config): Json<SampleSetConfig>,
) -> Response {
    let name = config.name.clone();
    match state.registry.add_set(config).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(json!({"name": name, "status": "created"})),
        )
            .into_response(),
        Err(e) => registry_error_response(e),
    }
}

/// List registered set names.
async fn list_sample_sets_handler(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.registry.set_names().await)
}

/// Remove a set and stop its collector.
async fn delete_sample_set_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    match state.registry.remove_set(&name).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => registry_error_response(e),
    }
}

/// Read the newest `count` samples of a set. `count <= 0` reads the whole
/// window.
async fn read_count_handler(
    State(state): State<Arc<AppState>>,
    Path((name, count)): Path<(String, i64)>,
    Query(params): Query<ReadQueryParams>,
) -> Response {
    let n = count.max(0) as usize;
    match state.registry.read_last_n(&name, n).await {
        Ok(samples) => samples_response(&samples, &params),
        Err(e) => registry_error_response(e),
    }
}

/// Read all samples strictly after a cutoff timestamp (unix seconds or
/// RFC 3339).
async fn read_since_handler(
    State(state): State<Arc<AppState>>,
    Path((name, timestamp)): Path<(String, String)>,
    Query(params): Query<ReadQueryParams>,
) -> Response {
    let Some(cutoff) = parse_timestamp(&timestamp) else {
        return (
            StatusCode::BAD_REQUEST,
            format!("Error: invalid timestamp '{timestamp}'"),
        )
            .into_response();
    };
    match state.registry.read_since(&name, cutoff).await {
        Ok(samples) => samples_response(&samples, &params),
        Err(e) => registry_error_response(e),
    }
}

/// Read all samples within a trailing range of now (e.g. `30s`, `5m`).
async fn read_range_handler(
    State(state): State<Arc<AppState>>,
    Path((name, range)): Path<(String, String)>,
    Query(params): Query<ReadQueryParams>,
) -> Response {
    let span = match parse_duration(&range) {
        Ok(span) => span,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                format!("Error: invalid range '{range}': {e}"),
            )
                .into_response();
        }
    };
    match state.registry.read_range(&name, span).await {
        Ok(samples) => samples_response(&samples, &params),
        Err(e) => registry_error_response(e),
    }
}

/// Render a window read, either as raw samples or projected through a JSON
/// path query.
fn samples_response(samples: &[Sample], params: &ReadQueryParams) -> Response {
    match &params.path {
        Some(path) => match extract_series(samples, path) {
            Ok(points) => Json(points).into_response(),
            Err(e) => (StatusCode::BAD_REQUEST, format!("Error: {}", e)).into_response(),
        },
        None => {
            Json(samples.iter().map(sample_to_json).collect::<Vec<_>>()).into_response()
        }
    }
}

/// JSON rendering of one sample. JSON payloads are embedded as-is; anything
/// else is carried as a base64 string.
fn sample_to_json(sample: &Sample) -> Value {
    let payload = match serde_json::from_slice::<Value>(&sample.payload) {
        Ok(value) => value,
        Err(_) => Value::String(STANDARD.encode(&sample.payload)),
    };
    json!({
        "time": sample.time.to_rfc3339(),
        "payload": payload,
    })
}

/// Cutoff timestamps are accepted as unix seconds or RFC 3339.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(secs) = s.parse::<i64>() {
        return Utc.timestamp_opt(secs, 0).single();
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn registry_error_response(err: SamplerError) -> Response {
    let status = match &err {
        SamplerError::DuplicateName(_) => StatusCode::CONFLICT,
        SamplerError::UnknownName(_) => StatusCode::NOT_FOUND,
        SamplerError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
    };
    (status, format!("Error: {}", err)).into_response()
}
