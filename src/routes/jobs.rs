use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::job::{JobRecord, JobState};
use crate::models::request::JobRequest;
use crate::models::response::JobResponse;
use crate::services::store::StateStore;

#[derive(Debug, Serialize)]
pub struct EnqueuedResponse {
    pub job_id: String,
    pub state: JobState,
}

/// POST /run — process a job and wait for its result.
pub async fn run_sync(
    State(state): State<AppState>,
    Json(request): Json<JobRequest>,
) -> Json<JobResponse> {
    Json(state.orchestrator.run(request).await)
}

/// POST /run/async — hand a job to the worker and return its id.
pub async fn run_async(
    State(state): State<AppState>,
    Json(mut request): Json<JobRequest>,
) -> Result<(StatusCode, Json<EnqueuedResponse>), StatusCode> {
    let job_id = request
        .id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    request.id = Some(job_id.clone());

    state.queue.enqueue(&request).await.map_err(|e| {
        tracing::error!(job_id = %job_id, error = %e, "Failed to enqueue job");
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    metrics::counter!("render_jobs_enqueued_total").increment(1);
    tracing::info!(job_id = %job_id, "Job enqueued");

    // No record exists until the worker picks the job up.
    Ok((
        StatusCode::ACCEPTED,
        Json(EnqueuedResponse {
            job_id,
            state: JobState::NotStarted,
        }),
    ))
}

/// GET /status/{job_id} — current job record.
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobRecord>, StatusCode> {
    match state.store.get(&job_id).await {
        Ok(Some(record)) => Ok(Json(record)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "Failed to read job record");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
