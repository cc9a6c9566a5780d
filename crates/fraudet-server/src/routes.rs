//! HTTP routes and handlers

use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use fraudet_core::{Classification, Error};
use fraudet_classifiers::CacheStatus;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, info};

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness))
        .route("/metrics", get(metrics))
        .route("/predict", post(predict))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .fallback(fallback)
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

/// Readiness reflects the cache state without triggering a load.
async fn readiness(State(state): State<AppState>) -> Response {
    match state.cache.status().await {
        CacheStatus::Ready { fingerprint } => (
            StatusCode::OK,
            Json(json!({"status": "ready", "fingerprint": fingerprint})),
        )
            .into_response(),
        CacheStatus::Empty => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "empty"})),
        )
            .into_response(),
        CacheStatus::Loading => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "loading"})),
        )
            .into_response(),
        CacheStatus::Failed { kind } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "failed", "error_kind": kind})),
        )
            .into_response(),
    }
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}

/// Classification request: one text or an ordered batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PredictRequest {
    Single { text: String },
    Batch { texts: Vec<String> },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum PredictResponse {
    Single(Classification),
    Batch { results: Vec<Classification> },
}

/// Main classification handler.
///
/// Payload shape is validated before the cache is touched; repeated
/// identical requests against a ready cache return identical results.
async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, AppError> {
    metrics::counter!("fraudet_requests_total").increment(1);
    let start = Instant::now();

    let Json(request) = payload
        .map_err(|e| Error::invalid_input(format!("malformed payload: {}", e)))?;
    if let PredictRequest::Batch { texts } = &request {
        if texts.is_empty() {
            return Err(Error::invalid_input("texts must be non-empty").into());
        }
    }

    let model = state.cache.get().await.map_err(AppError::from)?;
    let engine = model.engine();

    let response = match request {
        PredictRequest::Single { text } => {
            debug!(chars = text.len(), "Classifying single text");
            let result = engine.classify(&text).await?;
            metrics::counter!("fraudet_classifications_total").increment(1);
            PredictResponse::Single(result)
        }
        PredictRequest::Batch { texts } => {
            debug!(batch = texts.len(), "Classifying batch");
            let results = engine.classify_batch(&texts).await?;
            metrics::counter!("fraudet_classifications_total").increment(results.len() as u64);
            PredictResponse::Batch { results }
        }
    };

    metrics::histogram!("fraudet_request_latency_us")
        .record(start.elapsed().as_micros() as f64);
    info!(elapsed_us = start.elapsed().as_micros() as u64, "Prediction served");

    Ok(Json(response))
}

async fn fallback() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error_kind": "not_found", "message": "no such route"})),
    )
        .into_response()
}

/// Error translation boundary: every failure becomes a structured body
/// with a stable kind tag. Internal details (paths, task errors) are not
/// exposed.
pub struct AppError(Error);

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        metrics::counter!("fraudet_errors_total", "kind" => self.0.kind()).increment(1);

        let status = match &self.0 {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::Preprocessing(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::ArtifactNotFound(_)
            | Error::ArtifactTransfer(_)
            | Error::ModelLoad(_)
            | Error::LoadTimeout => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "internal error".to_string()
        } else {
            self.0.to_string()
        };

        let body = json!({
            "error_kind": self.0.kind(),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}
