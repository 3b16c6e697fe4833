//! Backup and restore handlers.
//!
//! Handlers await the workflow inside the request task; there is no queue.
//! Completed transfers answer 200, producer rejections pass their status
//! through, and every failure collapses to a generic 500 problem.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use snapferry_core::{
    SnapshotName, TransferDirection, TransferError, TransferOutcome, TransferResult, WorkloadId,
};
use tracing::{debug, info};

use crate::http::errors::ApiError;
use crate::models::TransferRequest;
use crate::state::ApiState;

pub(crate) async fn backup(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let (workload, snapshot) = parse_request(payload)?;
    let result = state.workflow.backup(&workload, &snapshot).await;
    respond(TransferDirection::Backup, &workload, &snapshot, result)
}

pub(crate) async fn restore(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let (workload, snapshot) = parse_request(payload)?;
    let result = state.workflow.restore(&workload, &snapshot).await;
    respond(TransferDirection::Restore, &workload, &snapshot, result)
}

fn parse_request(
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<(WorkloadId, SnapshotName), ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let workload = WorkloadId::parse(request.workload_id).map_err(invalid_field)?;
    let snapshot = SnapshotName::parse(request.snapshot_name).map_err(invalid_field)?;
    Ok((workload, snapshot))
}

fn invalid_field(err: TransferError) -> ApiError {
    match err {
        TransferError::Invalid { field, reason, .. } => {
            ApiError::bad_request(format!("{field} is invalid: {reason}"))
        }
        other => ApiError::bad_request(other.to_string()),
    }
}

fn respond(
    direction: TransferDirection,
    workload: &WorkloadId,
    snapshot: &SnapshotName,
    result: TransferResult<TransferOutcome>,
) -> Result<Response, ApiError> {
    match result {
        Ok(TransferOutcome::Completed) => {
            info!(direction = %direction, workload = %workload, snapshot = %snapshot, "transfer request completed");
            Ok(StatusCode::OK.into_response())
        }
        Ok(TransferOutcome::Rejected { status }) => {
            info!(direction = %direction, workload = %workload, snapshot = %snapshot, status, "transfer request rejected upstream");
            StatusCode::from_u16(status)
                .map(IntoResponse::into_response)
                .map_err(|_| ApiError::internal(format!("{direction} failed")))
        }
        Err(err) => {
            debug!(direction = %direction, kind = ?err.kind(), "transfer request failed");
            Err(ApiError::internal(format!("{direction} failed")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapferry_config::Secret;
    use snapferry_telemetry::Metrics;
    use snapferry_test_support::mocks::ScriptedWorkflow;

    use crate::state::BasicCredentials;

    fn state_with(workflow: ScriptedWorkflow) -> anyhow::Result<Arc<ApiState>> {
        Ok(Arc::new(ApiState::new(
            Arc::new(workflow),
            BasicCredentials::new("agent", Secret::new("s3cret")),
            Metrics::new()?,
        )))
    }

    fn request(workload: &str, snapshot: &str) -> Result<Json<TransferRequest>, JsonRejection> {
        Ok(Json(TransferRequest {
            workload_id: workload.to_string(),
            snapshot_name: snapshot.to_string(),
        }))
    }

    #[tokio::test]
    async fn completed_backup_answers_ok() -> anyhow::Result<()> {
        let workflow = ScriptedWorkflow::completing();
        let state = state_with(workflow.clone())?;
        let response = backup(State(state), request("web", "nightly"))
            .await
            .map_err(|err| anyhow::anyhow!("unexpected error {err:?}"))?;
        assert_eq!(response.status(), StatusCode::OK);
        let calls = workflow.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].direction, TransferDirection::Backup);
        assert_eq!(calls[0].snapshot, "nightly");
        Ok(())
    }

    #[tokio::test]
    async fn rejected_backup_passes_status_through() -> anyhow::Result<()> {
        let state = state_with(ScriptedWorkflow::rejecting(404))?;
        let response = backup(State(state), request("web", "nightly"))
            .await
            .map_err(|err| anyhow::anyhow!("unexpected error {err:?}"))?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn failed_restore_is_generic_internal_error() -> anyhow::Result<()> {
        let state = state_with(ScriptedWorkflow::failing())?;
        let err = restore(State(state), request("web", "nightly")).await.err();
        let err = err.ok_or_else(|| anyhow::anyhow!("expected an error"))?;
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = format!("{err:?}");
        assert!(!body.contains("credentials expired"));
        Ok(())
    }

    #[tokio::test]
    async fn invalid_snapshot_name_is_bad_request() -> anyhow::Result<()> {
        let workflow = ScriptedWorkflow::completing();
        let state = state_with(workflow.clone())?;
        let err = backup(State(state), request("web", "../etc")).await.err();
        assert_eq!(err.map(|err| err.status()), Some(StatusCode::BAD_REQUEST));
        assert!(workflow.calls().await.is_empty());
        Ok(())
    }
}
