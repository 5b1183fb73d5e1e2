use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Error,
}

/// Outcome of the image upload step.
///
/// Failures of individual items are collected in `details` instead of
/// aborting the step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepOutcome {
    pub status: StepStatus,
    pub message: String,
    pub details: Vec<String>,
}

impl StepOutcome {
    pub fn success(message: impl Into<String>, details: Vec<String>) -> Self {
        Self {
            status: StepStatus::Success,
            message: message.into(),
            details,
        }
    }

    pub fn error(message: impl Into<String>, details: Vec<String>) -> Self {
        Self {
            status: StepStatus::Error,
            message: message.into(),
            details,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }
}

/// Outcome of output materialization: one artifact reference per output file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessingResult {
    pub status: StepStatus,
    pub message: Vec<String>,
}

/// Response returned to the caller for every job, success or not.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum JobResponse {
    Finished {
        job_id: String,
        status: StepStatus,
        message: Vec<String>,
        refresh_worker: bool,
    },
    Rejected {
        error: String,
        job_id: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        details: Vec<String>,
    },
}

impl JobResponse {
    pub fn rejected(job_id: &str, error: impl Into<String>) -> Self {
        JobResponse::Rejected {
            error: error.into(),
            job_id: job_id.to_string(),
            details: Vec::new(),
        }
    }

    pub fn job_id(&self) -> &str {
        match self {
            JobResponse::Finished { job_id, .. } | JobResponse::Rejected { job_id, .. } => job_id,
        }
    }

    /// Whether the hosting worker should restart after this job.
    pub fn refresh_worker(&self) -> bool {
        matches!(self, JobResponse::Finished { refresh_worker: true, .. })
    }
}
