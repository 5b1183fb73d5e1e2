use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::sleep;

use crate::models::request::JobRequest;
use crate::services::orchestrator::JobOrchestrator;
use crate::services::queue::{JobQueue, QueueError};

/// Where the worker takes its jobs from.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Next job with the raw payload used to acknowledge it.
    async fn next_job(&self) -> Result<Option<(JobRequest, String)>, QueueError>;

    async fn acknowledge(&self, payload: &str) -> Result<(), QueueError>;
}

#[async_trait]
impl JobSource for JobQueue {
    async fn next_job(&self) -> Result<Option<(JobRequest, String)>, QueueError> {
        self.dequeue().await
    }

    async fn acknowledge(&self, payload: &str) -> Result<(), QueueError> {
        self.complete(payload).await
    }
}

/// Pulls jobs from a [`JobSource`] and runs up to `concurrency` at a time.
pub struct JobWorker {
    source: Arc<dyn JobSource>,
    orchestrator: Arc<JobOrchestrator>,
    concurrency: usize,
    idle_interval: Duration,
}

impl JobWorker {
    pub fn new(
        source: Arc<dyn JobSource>,
        orchestrator: Arc<JobOrchestrator>,
        concurrency: usize,
        idle_interval: Duration,
    ) -> Self {
        Self {
            source,
            orchestrator,
            concurrency,
            idle_interval,
        }
    }

    /// Process jobs until one asks for a worker refresh, then wait for the
    /// jobs still running. Returns how many jobs were started.
    pub async fn run(&self) -> usize {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let refresh = Arc::new(AtomicBool::new(false));
        let mut running = JoinSet::new();
        let mut started = 0;

        loop {
            while running.try_join_next().is_some() {}

            let permit = match permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            // Set before the finishing job releases its permit.
            if refresh.load(Ordering::SeqCst) {
                tracing::info!("Worker refresh requested, draining in-flight jobs");
                break;
            }

            match self.source.next_job().await {
                Ok(Some((job, payload))) => {
                    started += 1;
                    let source = self.source.clone();
                    let orchestrator = self.orchestrator.clone();
                    let refresh = refresh.clone();
                    running.spawn(async move {
                        if process_job(source.as_ref(), &orchestrator, job, &payload).await {
                            refresh.store(true, Ordering::SeqCst);
                        }
                        drop(permit);
                    });
                }
                Ok(None) => {
                    drop(permit);
                    tracing::trace!("No jobs available, sleeping");
                    sleep(self.idle_interval).await;
                }
                Err(e) => {
                    drop(permit);
                    tracing::error!(error = %e, "Error dequeuing job, will retry");
                    sleep(self.idle_interval).await;
                }
            }
        }

        while running.join_next().await.is_some() {}
        started
    }
}

/// Run one queued job and acknowledge it.
/// Returns true if the job asks for the worker to be refreshed.
async fn process_job(
    source: &dyn JobSource,
    orchestrator: &JobOrchestrator,
    job: JobRequest,
    payload: &str,
) -> bool {
    let response = orchestrator.run(job).await;

    tracing::info!(job_id = %response.job_id(), "Job finished");

    if let Err(e) = source.acknowledge(payload).await {
        tracing::error!(job_id = %response.job_id(), error = %e, "Failed to acknowledge job");
    }

    response.refresh_worker()
}
