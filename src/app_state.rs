use std::sync::Arc;
use std::time::Duration;

use crate::config::WorkerConfig;
use crate::services::{
    comfy::ComfyGateway,
    materialize::ResultMaterializer,
    orchestrator::{JobOrchestrator, OrchestratorSettings},
    queue::{JobQueue, QueueError},
    storage::{BucketClient, StorageError},
    store::{JobRecorder, RedisStateStore, StoreError, TracingSink},
};

/// Shared application state passed to route handlers and the worker loop.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RedisStateStore>,
    pub queue: Arc<JobQueue>,
    pub backend: Arc<ComfyGateway>,
    pub orchestrator: Arc<JobOrchestrator>,
}

impl AppState {
    /// Wire every collaborator from configuration.
    pub fn from_config(config: &WorkerConfig) -> Result<Self, StartupError> {
        let store = Arc::new(RedisStateStore::new(&config.redis_url)?);
        let queue = Arc::new(JobQueue::new(&config.redis_url)?);

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(StartupError::Http)?;
        let backend = Arc::new(ComfyGateway::with_client(http, config.comfy_base_url()));

        let materializer = match config.bucket() {
            Some(bucket) => {
                tracing::info!(endpoint = %bucket.endpoint, bucket = %bucket.bucket, "Uploading outputs to object storage");
                ResultMaterializer::uploading(
                    config.comfy_output_path.clone(),
                    Arc::new(BucketClient::new(&bucket)?),
                )
            }
            None => {
                tracing::info!("Returning outputs as base64");
                ResultMaterializer::inline(config.comfy_output_path.clone())
            }
        };

        let recorder = JobRecorder::new(store.clone(), Arc::new(TracingSink));
        let settings = OrchestratorSettings {
            availability: config.availability_policy(),
            polling: config.polling_policy(),
            refresh_worker: config.refresh_worker,
        };
        let orchestrator = Arc::new(JobOrchestrator::new(
            recorder,
            backend.clone(),
            materializer,
            settings,
        ));

        Ok(Self {
            store,
            queue,
            backend,
            orchestrator,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("State store: {0}")]
    Store(#[from] StoreError),

    #[error("Job queue: {0}")]
    Queue(#[from] QueueError),

    #[error("Object storage: {0}")]
    Storage(#[from] StorageError),

    #[error("HTTP client: {0}")]
    Http(reqwest::Error),
}
