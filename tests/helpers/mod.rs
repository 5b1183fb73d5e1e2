//! In-memory collaborators for orchestrator tests

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use comfy_job_worker::models::history::HistoryEntry;
use comfy_job_worker::models::job::{JobRecord, JobState};
use comfy_job_worker::services::comfy::{GatewayError, RenderBackend};
use comfy_job_worker::services::materialize::ResultMaterializer;
use comfy_job_worker::services::orchestrator::{JobOrchestrator, OrchestratorSettings};
use comfy_job_worker::services::retry::RetryPolicy;
use comfy_job_worker::services::storage::{ArtifactStore, StorageError};
use comfy_job_worker::services::store::{JobRecorder, StateStore, StoreError, TracingSink};

/// State store keeping every write, so tests can check the transition order.
#[derive(Default)]
pub struct MemoryStore {
    writes: Mutex<Vec<JobRecord>>,
    latest: Mutex<HashMap<String, JobRecord>>,
}

impl MemoryStore {
    pub fn writes(&self) -> Vec<JobRecord> {
        self.writes.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<JobState> {
        self.writes.lock().unwrap().iter().map(|r| r.state).collect()
    }

    pub fn latest(&self, job_id: &str) -> Option<JobRecord> {
        self.latest.lock().unwrap().get(job_id).cloned()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn put(&self, record: &JobRecord) -> Result<(), StoreError> {
        self.writes.lock().unwrap().push(record.clone());
        self.latest
            .lock()
            .unwrap()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.latest(job_id))
    }
}

/// State store whose every write fails.
pub struct BrokenStore;

#[async_trait]
impl StateStore for BrokenStore {
    async fn put(&self, _record: &JobRecord) -> Result<(), StoreError> {
        Err(StoreError::Redis(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "connection refused",
        ))))
    }

    async fn get(&self, _job_id: &str) -> Result<Option<JobRecord>, StoreError> {
        Ok(None)
    }
}

/// What a scripted history call returns.
pub enum HistoryStep {
    Unknown,
    Pending,
    Done(serde_json::Value),
    Fail,
}

/// Backend fake with per-operation call counters.
pub struct ScriptedBackend {
    pub ready: bool,
    pub reject_uploads: Vec<String>,
    pub submit_fails: bool,
    history: Mutex<VecDeque<HistoryStep>>,
    pub pings: AtomicUsize,
    pub uploads: AtomicUsize,
    pub submits: AtomicUsize,
    pub history_calls: AtomicUsize,
}

impl ScriptedBackend {
    /// A ready backend that reports `outputs` after `pending` incomplete polls.
    pub fn completing_after(pending: usize, outputs: serde_json::Value) -> Self {
        let mut script: VecDeque<_> = (0..pending).map(|_| HistoryStep::Pending).collect();
        script.push_back(HistoryStep::Done(outputs));
        Self::with_history(script)
    }

    pub fn with_history(script: VecDeque<HistoryStep>) -> Self {
        Self {
            ready: true,
            reject_uploads: Vec::new(),
            submit_fails: false,
            history: Mutex::new(script),
            pings: AtomicUsize::new(0),
            uploads: AtomicUsize::new(0),
            submits: AtomicUsize::new(0),
            history_calls: AtomicUsize::new(0),
        }
    }

    pub fn total_calls(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
            + self.uploads.load(Ordering::SeqCst)
            + self.submits.load(Ordering::SeqCst)
            + self.history_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderBackend for ScriptedBackend {
    async fn ping(&self) -> Result<bool, GatewayError> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        Ok(self.ready)
    }

    async fn upload_asset(&self, name: &str, _bytes: Vec<u8>) -> Result<(), GatewayError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.reject_uploads.iter().any(|n| n == name) {
            return Err(GatewayError::Api {
                status: 400,
                body: "invalid image file".to_string(),
            });
        }
        Ok(())
    }

    async fn submit(&self, _workflow: &serde_json::Value) -> Result<String, GatewayError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        if self.submit_fails {
            return Err(GatewayError::Api {
                status: 400,
                body: "prompt_outputs_failed_validation".to_string(),
            });
        }
        Ok("prompt-1".to_string())
    }

    async fn get_history(&self, prompt_id: &str) -> Result<Option<HistoryEntry>, GatewayError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(prompt_id, "prompt-1");
        // an exhausted script keeps reporting pending
        let step = self.history.lock().unwrap().pop_front().unwrap_or(HistoryStep::Pending);
        match step {
            HistoryStep::Unknown => Ok(None),
            HistoryStep::Pending => Ok(Some(HistoryEntry::default())),
            HistoryStep::Done(outputs) => Ok(Some(
                serde_json::from_value(serde_json::json!({ "outputs": outputs })).unwrap(),
            )),
            HistoryStep::Fail => Err(GatewayError::Api {
                status: 500,
                body: "history unavailable".to_string(),
            }),
        }
    }
}

pub fn fast_settings(max_attempts: u32) -> OrchestratorSettings {
    let policy = RetryPolicy::new(Duration::from_millis(1), max_attempts);
    OrchestratorSettings {
        availability: policy,
        polling: policy,
        refresh_worker: false,
    }
}

pub fn orchestrator(
    store: Arc<dyn StateStore>,
    backend: Arc<ScriptedBackend>,
    output_root: &std::path::Path,
    settings: OrchestratorSettings,
) -> JobOrchestrator {
    orchestrator_with(store, backend, ResultMaterializer::inline(output_root), settings)
}

pub fn orchestrator_with(
    store: Arc<dyn StateStore>,
    backend: Arc<ScriptedBackend>,
    materializer: ResultMaterializer,
    settings: OrchestratorSettings,
) -> JobOrchestrator {
    JobOrchestrator::new(
        JobRecorder::new(store, Arc::new(TracingSink)),
        backend,
        materializer,
        settings,
    )
}

/// Artifact store whose every upload fails.
pub struct RejectingBucket;

#[async_trait]
impl ArtifactStore for RejectingBucket {
    async fn put_artifact(
        &self,
        _job_id: &str,
        _path: &std::path::Path,
    ) -> Result<String, StorageError> {
        Err(StorageError::Config("bucket rejected credentials".to_string()))
    }
}
