use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, FromRequest, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::batch::{BatchReport, BatchRow};
use crate::client::Analysis;
use crate::config::SenseConfig;
use crate::error::{Result, SenseError};
use crate::export::{csv_file_name, ratings_csv};
use crate::lexicon;
use crate::metrics::Metrics;
use crate::review::{AggregatedRating, ReviewSubmission, ReviewWithResult, SentimentResult};
use crate::service::{ComparisonItem, MovieSense, RatingInput, RatingOutcome};

const PROXY_FAILURE: &str = "Failed to analyze sentiment";

#[derive(Clone)]
pub struct AppState {
    pub sense: Arc<MovieSense>,
    proxy: reqwest::Client,
    upstream_url: String,
}

impl AppState {
    pub fn new(sense: Arc<MovieSense>, upstream_url: impl Into<String>, proxy_timeout: Duration) -> Result<Self> {
        let proxy = reqwest::Client::builder()
            .timeout(proxy_timeout)
            .build()
            .map_err(|e| SenseError::Config(format!("http client: {e}")))?;
        Ok(Self {
            sense,
            proxy,
            upstream_url: upstream_url.into(),
        })
    }

    pub fn from_config(cfg: &SenseConfig) -> Result<Self> {
        let sense = Arc::new(MovieSense::from_config(cfg)?);
        Self::new(sense, cfg.upstream_url.clone(), cfg.primary_timeout())
    }
}

/// Full HTTP surface, including `/metrics`.
pub fn router(state: AppState) -> Router {
    let metrics = Metrics::init();

    Router::new()
        .route("/health", get(health))
        .route("/api/analyze-sentiment", post(proxy_analyze))
        .route("/analyze", post(analyze))
        .route("/analyze/lightweight", post(analyze_lightweight))
        .route("/history", get(list_history))
        .route("/history/{id}", delete(delete_history))
        .route("/history/reload", post(reload_history))
        .route("/compare", post(compare))
        .route("/batch", post(batch))
        .route("/ratings", get(list_ratings).post(create_rating))
        .route("/ratings/{id}", delete(delete_rating))
        .route("/ratings/{id}/export", get(export_rating))
        .with_state(state)
        .merge(metrics.router())
        .layer(CorsLayer::very_permissive())
}

/// `SenseError` rendered as `{"error": ...}` with a matching status.
pub struct ApiError(SenseError);

impl From<SenseError> for ApiError {
    fn from(e: SenseError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SenseError::Validation(_) => StatusCode::BAD_REQUEST,
            SenseError::Network(_) | SenseError::Timeout { .. } | SenseError::Upstream(_) => {
                StatusCode::BAD_GATEWAY
            }
            SenseError::Storage(_) | SenseError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        Self(SenseError::Validation(r.body_text()))
    }
}

/// `Json` whose rejections (bad syntax, wrong content type, wrong shape) answer
/// 400 `{"error": ...}` like every other validation failure.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

type ApiResult<T> = std::result::Result<T, ApiError>;

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "tiers": state.sense.client().tier_names(),
    }))
}

/// Pass-through to the upstream model service. Every failure collapses to one message.
async fn proxy_analyze(State(state): State<AppState>, body: Bytes) -> Response {
    let failure = || {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": PROXY_FAILURE })),
        )
            .into_response()
    };

    let body: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(target: "api", error = %e, "proxy request body is not JSON");
            return failure();
        }
    };

    let resp = match state.proxy.post(&state.upstream_url).json(&body).send().await {
        Ok(r) => r,
        Err(e) => {
            warn!(target: "api", error = %e, "proxy request failed");
            return failure();
        }
    };
    if !resp.status().is_success() {
        warn!(target: "api", status = %resp.status(), "proxy upstream returned error status");
        return failure();
    }
    match resp.json::<Value>().await {
        Ok(v) => Json(v).into_response(),
        Err(e) => {
            warn!(target: "api", error = %e, "proxy upstream body unreadable");
            failure()
        }
    }
}

async fn analyze(
    State(state): State<AppState>,
    ApiJson(sub): ApiJson<ReviewSubmission>,
) -> ApiResult<Json<Analysis>> {
    Ok(Json(state.sense.submit(sub).await?))
}

async fn analyze_lightweight(ApiJson(sub): ApiJson<ReviewSubmission>) -> ApiResult<Json<SentimentResult>> {
    sub.validate()?;
    Ok(Json(lexicon::analyze(&sub.review)))
}

async fn list_history(State(state): State<AppState>) -> Json<Vec<ReviewWithResult>> {
    Json(state.sense.history().reviews())
}

async fn delete_history(State(state): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    if state.sense.history().delete_review(id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Serialize)]
struct ReloadResp {
    reviews: usize,
    ratings: usize,
}

/// Re-read persisted lists, picking up writes made by another process.
async fn reload_history(State(state): State<AppState>) -> Json<ReloadResp> {
    let history = state.sense.history();
    history.reload();
    Json(ReloadResp {
        reviews: history.reviews().len(),
        ratings: history.ratings().len(),
    })
}

#[derive(Deserialize)]
struct CompareReq {
    items: Vec<ReviewSubmission>,
}

#[derive(Serialize)]
struct CompareResp {
    items: Vec<ComparisonItem>,
    failed: usize,
}

async fn compare(State(state): State<AppState>, ApiJson(req): ApiJson<CompareReq>) -> ApiResult<Json<CompareResp>> {
    let items = state.sense.compare(req.items).await?;
    let failed = items.iter().filter(|i| i.error.is_some()).count();
    Ok(Json(CompareResp { items, failed }))
}

#[derive(Deserialize)]
struct BatchReq {
    rows: Vec<BatchRow>,
}

async fn batch(State(state): State<AppState>, ApiJson(req): ApiJson<BatchReq>) -> Json<BatchReport> {
    let report = state
        .sense
        .batch(req.rows, |pct| debug!(target: "api", progress = pct, "batch progress"))
        .await;
    Json(report)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RatingReq {
    movie_title: String,
    reviews: Vec<RatingInput>,
}

async fn create_rating(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RatingReq>,
) -> ApiResult<Json<RatingOutcome>> {
    Ok(Json(state.sense.rate(&req.movie_title, req.reviews).await?))
}

async fn list_ratings(State(state): State<AppState>) -> Json<Vec<AggregatedRating>> {
    Json(state.sense.history().ratings())
}

async fn delete_rating(State(state): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    if state.sense.delete_rating(id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn export_rating(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let Some(rating) = state.sense.history().rating(id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "rating not found" })),
        )
            .into_response();
    };
    let disposition = format!(
        "attachment; filename=\"{}\"",
        csv_file_name(&rating.movie_title)
    );
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        ratings_csv(&rating),
    )
        .into_response()
}
