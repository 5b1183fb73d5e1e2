use async_trait::async_trait;
use redis::AsyncCommands;
use std::sync::Arc;

use crate::models::job::JobRecord;

/// Durable key-value persistence for job records.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Overwrite the record stored under `job:<id>`.
    async fn put(&self, record: &JobRecord) -> Result<(), StoreError>;

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError>;
}

/// Redis-backed job record store.
pub struct RedisStateStore {
    client: redis::Client,
}

impl RedisStateStore {
    pub fn new(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url).map_err(StoreError::Redis)?;
        Ok(Self { client })
    }

    /// Check Redis connectivity (for health checks).
    pub async fn health_check(&self) -> Result<(), StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn put(&self, record: &JobRecord) -> Result<(), StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(record)?;
        conn.set::<_, _, ()>(record.key(), payload).await?;
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(JobRecord::key_for(job_id)).await?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Receives persistence outcomes the orchestrator itself never checks.
pub trait RecordSink: Send + Sync {
    fn recorded(&self, _record: &JobRecord) {}

    fn record_failed(&self, record: &JobRecord, error: &StoreError);
}

/// Default sink: structured logs plus a failure counter.
pub struct TracingSink;

impl RecordSink for TracingSink {
    fn recorded(&self, record: &JobRecord) {
        tracing::info!(job_id = %record.id, state = %record.state, "Updated job state");
    }

    fn record_failed(&self, record: &JobRecord, error: &StoreError) {
        metrics::counter!("job_record_failures_total").increment(1);
        tracing::error!(
            job_id = %record.id,
            state = %record.state,
            error = %error,
            "Failed to persist job state"
        );
    }
}

/// Fire-and-forget writer used by the orchestrator.
#[derive(Clone)]
pub struct JobRecorder {
    store: Arc<dyn StateStore>,
    sink: Arc<dyn RecordSink>,
}

impl JobRecorder {
    pub fn new(store: Arc<dyn StateStore>, sink: Arc<dyn RecordSink>) -> Self {
        Self { store, sink }
    }

    /// Persist `record`. Errors go to the sink and are otherwise dropped.
    pub async fn record(&self, record: JobRecord) {
        match self.store.put(&record).await {
            Ok(()) => self.sink.recorded(&record),
            Err(e) => self.sink.record_failed(&record, &e),
        }
    }

    pub async fn fail(&self, job_id: &str, error: impl Into<String>) {
        self.record(JobRecord::failed(job_id, error)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct BrokenStore;

    #[async_trait]
    impl StateStore for BrokenStore {
        async fn put(&self, _record: &JobRecord) -> Result<(), StoreError> {
            Err(StoreError::Redis(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "connection reset",
            ))))
        }

        async fn get(&self, _job_id: &str) -> Result<Option<JobRecord>, StoreError> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct CountingSink {
        ok: AtomicUsize,
        failed: AtomicUsize,
    }

    impl RecordSink for CountingSink {
        fn recorded(&self, _record: &JobRecord) {
            self.ok.fetch_add(1, Ordering::SeqCst);
        }

        fn record_failed(&self, _record: &JobRecord, _error: &StoreError) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_store_failure_goes_to_sink() {
        let sink = Arc::new(CountingSink::default());
        let recorder = JobRecorder::new(Arc::new(BrokenStore), sink.clone());

        recorder.record(JobRecord::in_queue("j1")).await;
        recorder.fail("j1", "boom").await;

        assert_eq!(sink.failed.load(Ordering::SeqCst), 2);
        assert_eq!(sink.ok.load(Ordering::SeqCst), 0);
    }
}
