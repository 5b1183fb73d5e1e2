//! Drives one render job from validation to a terminal state.
//!
//! The orchestrator owns the job record lifecycle:
//!
//! ```text
//! NOT_STARTED -> IN_QUEUE -> COMPLETED
//!      \             \
//!       +-------------+----> FAILED
//! ```
//!
//! Validation failures go straight to `FAILED`. Every transition is written
//! through [`JobRecorder`], which never reports errors back here, and every
//! failure is turned into a `{error, job_id}` response instead of bubbling up.

use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::models::history::HistoryEntry;
use crate::models::job::JobRecord;
use crate::models::request::JobRequest;
use crate::models::response::{JobResponse, StepStatus};
use crate::services::comfy::{GatewayError, RenderBackend};
use crate::services::materialize::ResultMaterializer;
use crate::services::retry::{poll_until, RetryPolicy};
use crate::services::store::JobRecorder;
use crate::services::upload::upload_images;
use crate::services::validation::{validate_input, ValidationError};

/// Every way a job can end in `FAILED`.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("ComfyUI API unavailable")]
    BackendUnavailable,

    #[error("{message}")]
    Upload { message: String, details: Vec<String> },

    #[error("error queuing workflow: {0}")]
    Submission(GatewayError),

    #[error("max retries reached while waiting for image generation")]
    PollTimeout,

    #[error("error polling for image generation: {0}")]
    PollTransport(GatewayError),

    /// `cause` is logged but kept out of the stored record.
    #[error("image processing failed")]
    Materialization { cause: String },
}

impl JobError {
    /// Short label used as a metrics dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::Validation(_) => "validation",
            JobError::BackendUnavailable => "backend_unavailable",
            JobError::Upload { .. } => "upload",
            JobError::Submission(_) => "submission",
            JobError::PollTimeout => "poll_timeout",
            JobError::PollTransport(_) => "poll_transport",
            JobError::Materialization { .. } => "materialization",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
    /// Budget for waiting on the backend to come up.
    pub availability: RetryPolicy,
    /// Budget for waiting on a submitted workflow to finish.
    pub polling: RetryPolicy,
    /// Reported back to the host with every finished job.
    pub refresh_worker: bool,
}

pub struct JobOrchestrator {
    recorder: JobRecorder,
    backend: Arc<dyn RenderBackend>,
    materializer: ResultMaterializer,
    settings: OrchestratorSettings,
}

impl JobOrchestrator {
    pub fn new(
        recorder: JobRecorder,
        backend: Arc<dyn RenderBackend>,
        materializer: ResultMaterializer,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            recorder,
            backend,
            materializer,
            settings,
        }
    }

    /// Run one job to completion. Never fails: errors become a `FAILED`
    /// record and a rejected response.
    #[tracing::instrument(skip_all, fields(job_id = tracing::field::Empty))]
    pub async fn run(&self, request: JobRequest) -> JobResponse {
        let job_id = request
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        tracing::Span::current().record("job_id", job_id.as_str());

        let started = Instant::now();
        metrics::counter!("render_jobs_total").increment(1);

        let response = match self.execute(&job_id, &request.input).await {
            Ok(response) => {
                metrics::counter!("render_jobs_completed_total").increment(1);
                response
            }
            Err(e) => {
                metrics::counter!("render_jobs_failed_total", "reason" => e.kind()).increment(1);
                match &e {
                    JobError::Materialization { cause } => {
                        tracing::error!(error = %e, reason = e.kind(), cause = %cause, "Job failed")
                    }
                    _ => tracing::error!(error = %e, reason = e.kind(), "Job failed"),
                }
                self.recorder.fail(&job_id, e.to_string()).await;
                match e {
                    JobError::Upload { message, details } => JobResponse::Rejected {
                        error: message,
                        job_id,
                        details,
                    },
                    other => JobResponse::rejected(&job_id, other.to_string()),
                }
            }
        };

        metrics::histogram!("render_job_duration_seconds").record(started.elapsed().as_secs_f64());
        response
    }

    async fn execute(&self, job_id: &str, input: &serde_json::Value) -> Result<JobResponse, JobError> {
        let request = validate_input(input)?;

        self.recorder
            .record(JobRecord::not_started(job_id, request.workflow.clone()))
            .await;

        if !self.backend.probe(&self.settings.availability).await {
            return Err(JobError::BackendUnavailable);
        }

        let upload = upload_images(self.backend.as_ref(), &request.images).await;
        if !upload.is_success() {
            return Err(JobError::Upload {
                message: upload.message,
                details: upload.details,
            });
        }

        self.recorder.record(JobRecord::in_queue(job_id)).await;

        let prompt_id = self
            .backend
            .submit(&request.workflow)
            .await
            .map_err(JobError::Submission)?;
        tracing::info!(prompt_id = %prompt_id, "Queued workflow");

        let entry = self.wait_for_outputs(&prompt_id).await?;

        let outputs = self.materializer.process_outputs(&entry, job_id).await;
        if outputs.status != StepStatus::Success {
            let cause = outputs.message.into_iter().next().unwrap_or_default();
            return Err(JobError::Materialization { cause });
        }

        self.recorder
            .record(JobRecord::completed(job_id, outputs.message.clone()))
            .await;

        Ok(JobResponse::Finished {
            job_id: job_id.to_string(),
            status: outputs.status,
            message: outputs.message,
            refresh_worker: self.settings.refresh_worker,
        })
    }

    /// Poll history until the prompt reports outputs.
    async fn wait_for_outputs(&self, prompt_id: &str) -> Result<HistoryEntry, JobError> {
        tracing::info!(prompt_id, "Polling for image generation completion");

        let backend = self.backend.as_ref();
        let entry = poll_until(&self.settings.polling, |attempt| async move {
            let entry = backend.get_history(prompt_id).await?;
            tracing::trace!(prompt_id, attempt, "Checked generation history");
            Ok::<_, GatewayError>(entry.filter(HistoryEntry::is_complete))
        })
        .await
        .map_err(JobError::PollTransport)?;

        entry.ok_or(JobError::PollTimeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_materialization_cause_stays_out_of_message() {
        let error = JobError::Materialization {
            cause: "S3 error: 403 Forbidden".to_string(),
        };
        assert_eq!(error.to_string(), "image processing failed");
        assert_eq!(error.kind(), "materialization");
        assert!(matches!(error, JobError::Materialization { ref cause } if cause.contains("403")));
    }
}
