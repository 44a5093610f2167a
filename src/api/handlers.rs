//! Request handlers for the HTTP boundary

use crate::error::MatchmakingError;
use crate::service::{HealthCheck, HealthStatus, MatchmakingService};
use crate::types::{PlayerId, PlayerPayload, QueueKind};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

pub type ApiState = Arc<MatchmakingService>;

/// Error body returned by every failing handler
#[derive(Debug)]
pub struct ApiError(MatchmakingError);

impl From<MatchmakingError> for ApiError {
    fn from(error: MatchmakingError) -> Self {
        ApiError(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(MatchmakingError::invalid(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            MatchmakingError::InvalidPlayerData { .. } | MatchmakingError::UnknownQueue { .. } => {
                StatusCode::BAD_REQUEST
            }
            MatchmakingError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            debug!("Request rejected: {}", self.0);
        }

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub async fn ping() -> &'static str {
    "ok"
}

pub async fn health(State(service): State<ApiState>) -> impl IntoResponse {
    let health = HealthCheck::check(&service).await;
    let status = match health.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(health))
}

pub async fn metrics(State(service): State<ApiState>) -> Response {
    let metric_families = service.metrics().registry().gather();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            buffer,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics",
            )
                .into_response()
        }
    }
}

pub async fn add_player(
    State(service): State<ApiState>,
    Path(kind): Path<String>,
    payload: Result<Json<PlayerPayload>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let queue: QueueKind = kind.parse()?;
    let Json(payload) = payload?;

    let added = service.add_player(queue, payload)?;
    let status = if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(json!({ "added": added }))))
}

pub async fn add_to_both(
    State(service): State<ApiState>,
    payload: Result<Json<PlayerPayload>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let outcome = service.add_to_both(payload)?;

    let status = if outcome.added_as_killer || outcome.added_as_victim {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}

pub async fn remove_player(
    State(service): State<ApiState>,
    Path((kind, id)): Path<(String, PlayerId)>,
) -> ApiResult<impl IntoResponse> {
    let queue: QueueKind = kind.parse()?;
    let removed = service.remove_player(queue, id)?;
    Ok(Json(json!({ "removed": removed })))
}

pub async fn snapshot(State(service): State<ApiState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(service.snapshot()?))
}

pub async fn queue_lengths(State(service): State<ApiState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(service.queue_lengths()?))
}

pub async fn player_status(
    State(service): State<ApiState>,
    Path(id): Path<PlayerId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(service.player_status(id)?))
}

pub async fn reset_queues(State(service): State<ApiState>) -> ApiResult<impl IntoResponse> {
    let cleared = service.reset_queues()?;
    Ok(Json(json!({ "reset": true, "cleared": cleared })))
}

pub async fn reconcile(State(service): State<ApiState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(service.reconcile().await?))
}
