//! Liveness and Prometheus exposition, both served without credentials.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use snapferry_telemetry::build_sha;
use tracing::error;

use crate::http::constants::METRICS_CONTENT_TYPE;
use crate::http::errors::ApiError;
use crate::models::HealthResponse;
use crate::state::ApiState;

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_owned(),
        build: build_sha().to_owned(),
    })
}

pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    let exposition = state.telemetry.render().map_err(|err| {
        error!(error = %err, "metrics exposition unavailable");
        ApiError::internal("metrics exposition unavailable")
    })?;
    Ok(([(CONTENT_TYPE, METRICS_CONTENT_TYPE)], exposition).into_response())
}
