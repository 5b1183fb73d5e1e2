use redis::AsyncCommands;

use crate::models::request::JobRequest;

const QUEUE_KEY: &str = "comfy_worker:jobs";
const PROCESSING_KEY: &str = "comfy_worker:processing";

/// Redis-backed list of job payloads waiting for the worker.
pub struct JobQueue {
    client: redis::Client,
}

impl JobQueue {
    pub fn new(redis_url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url).map_err(QueueError::Redis)?;
        Ok(Self { client })
    }

    /// Enqueue a job payload.
    pub async fn enqueue(&self, job: &JobRequest) -> Result<(), QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(job)?;
        conn.lpush::<_, _, ()>(QUEUE_KEY, &payload).await?;
        Ok(())
    }

    /// Take the oldest job, moving it to the processing list.
    ///
    /// Returns the parsed job together with its raw payload, which is
    /// needed to acknowledge it with [`JobQueue::complete`].
    pub async fn dequeue(&self) -> Result<Option<(JobRequest, String)>, QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let result: Option<String> = conn.rpoplpush(QUEUE_KEY, PROCESSING_KEY).await?;

        match result {
            Some(payload) => match serde_json::from_str(&payload) {
                Ok(job) => Ok(Some((job, payload))),
                Err(e) => {
                    // unparseable payloads would otherwise sit in processing forever
                    conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &payload).await?;
                    Err(QueueError::Serialize(e))
                }
            },
            None => Ok(None),
        }
    }

    /// Get the current queue depth (pending jobs).
    pub async fn queue_depth(&self) -> Result<u64, QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let depth: u64 = conn.llen(QUEUE_KEY).await?;
        Ok(depth)
    }

    /// Mark a job as finished (remove from the processing list).
    pub async fn complete(&self, payload: &str) -> Result<(), QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, payload).await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
