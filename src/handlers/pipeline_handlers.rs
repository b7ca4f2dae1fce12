use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::SignedCookieJar;
use tracing::{info, instrument, warn};

use super::require_admin;
use crate::dto::PipelineRunResponse;
use crate::pipeline::{run_pipeline, Pipeline};
use crate::state::AppState;

/// Runs a pipeline for an admin and reports every step
///
/// ### Returns
///
/// * 200 with `{"status":"success","report":…}` when no step failed
/// * 500 with `{"status":"error",…}` and the report when a step failed
/// * 401 when the caller is not an admin
/// * 409 when another run holds the lock
async fn run_for_admin(state: AppState, jar: SignedCookieJar, pipeline: Pipeline) -> Response {
    if require_admin(&state, &jar).is_err() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(PipelineRunResponse::error("Unauthorized", None)),
        )
            .into_response();
    }

    let Ok(_running) = state.pipeline_lock.try_lock() else {
        warn!("Rejected {} run: another run is in progress", pipeline);
        return (
            StatusCode::CONFLICT,
            Json(PipelineRunResponse::error("A pipeline run is already in progress", None)),
        )
            .into_response();
    };

    let report = run_pipeline(&state.pipeline_context(), pipeline).await;

    if report.has_failures() {
        let failed: Vec<&str> = report.failed_steps().iter().map(|s| s.name()).collect();
        let message = format!("Failed steps: {}", failed.join(", "));
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(PipelineRunResponse::error(message, Some(report))),
        )
            .into_response()
    } else {
        info!("Pipeline {} completed", pipeline);
        Json(PipelineRunResponse::success(report)).into_response()
    }
}

/// Handler for `POST /run_create_cards`
#[instrument(skip_all)]
pub async fn run_create_cards_handler(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
    run_for_admin(state, jar, Pipeline::CreateCards).await
}

/// Handler for `POST /run_change_card_owner`
#[instrument(skip_all)]
pub async fn run_change_card_owner_handler(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
    run_for_admin(state, jar, Pipeline::ChangeOwner).await
}
