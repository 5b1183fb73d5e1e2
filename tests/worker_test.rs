//! Worker loop behavior against an in-memory job source.

mod fixtures;
mod helpers;

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use comfy_job_worker::models::job::JobState;
use comfy_job_worker::models::request::JobRequest;
use comfy_job_worker::services::queue::QueueError;
use comfy_job_worker::services::worker::{JobSource, JobWorker};
use fixtures::*;
use helpers::*;

/// Job source backed by a local list.
#[derive(Default)]
struct MemorySource {
    pending: Mutex<VecDeque<JobRequest>>,
    acknowledged: Mutex<Vec<String>>,
}

impl MemorySource {
    fn with_jobs(ids: &[&str]) -> Self {
        let pending = ids
            .iter()
            .map(|id| JobRequest {
                id: Some(id.to_string()),
                input: json!({ "workflow": workflow() }),
            })
            .collect();
        Self {
            pending: Mutex::new(pending),
            ..Default::default()
        }
    }
}

#[async_trait]
impl JobSource for MemorySource {
    async fn next_job(&self) -> Result<Option<(JobRequest, String)>, QueueError> {
        Ok(self.pending.lock().unwrap().pop_front().map(|job| {
            let payload = serde_json::to_string(&job).unwrap();
            (job, payload)
        }))
    }

    async fn acknowledge(&self, payload: &str) -> Result<(), QueueError> {
        self.acknowledged.lock().unwrap().push(payload.to_string());
        Ok(())
    }
}

#[tokio::test]
async fn test_refresh_stops_after_single_job() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::default());
    let backend = Arc::new(ScriptedBackend::completing_after(0, outputs(&[])));
    let mut settings = fast_settings(3);
    settings.refresh_worker = true;
    let orchestrator = Arc::new(orchestrator(store.clone(), backend, dir.path(), settings));

    let source = Arc::new(MemorySource::with_jobs(&["job-a", "job-b", "job-c"]));
    let worker = JobWorker::new(source.clone(), orchestrator, 1, Duration::from_millis(1));

    let started = tokio::time::timeout(Duration::from_secs(5), worker.run())
        .await
        .expect("worker should exit after a refresh request");

    assert_eq!(started, 1);
    assert_eq!(source.acknowledged.lock().unwrap().len(), 1);
    assert_eq!(source.pending.lock().unwrap().len(), 2);
    assert_eq!(store.latest("job-a").unwrap().state, JobState::Completed);
    assert!(store.latest("job-b").is_none());
}
