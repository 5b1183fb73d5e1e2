use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::retry::RetryPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Unused by the worker.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Redis connection string for job records and the job queue
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// host:port of the local ComfyUI instance
    #[serde(default = "default_comfy_host")]
    pub comfy_host: String,

    #[serde(default = "default_api_available_interval_ms")]
    pub comfy_api_available_interval_ms: u64,

    #[serde(default = "default_api_available_max_retries")]
    pub comfy_api_available_max_retries: u32,

    #[serde(default = "default_polling_interval_ms")]
    pub comfy_polling_interval_ms: u64,

    #[serde(default = "default_polling_max_retries")]
    pub comfy_polling_max_retries: u32,

    /// Directory ComfyUI writes generated images into
    #[serde(default = "default_output_path")]
    pub comfy_output_path: PathBuf,

    /// S3-compatible endpoint. When unset, outputs are returned as base64.
    pub bucket_endpoint_url: Option<String>,

    #[serde(default = "default_bucket_name")]
    pub bucket_name: String,

    pub bucket_access_key_id: Option<String>,

    pub bucket_secret_access_key: Option<String>,

    /// Ask the host to restart the worker after every job
    #[serde(default)]
    pub refresh_worker: bool,

    /// Maximum number of jobs the worker runs at once
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    /// Delay before the startup warmup probes the backend
    #[serde(default)]
    pub startup_delay_secs: u64,

    /// Checkpoint directory inspected by the startup warmup
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    /// Checkpoint file names expected to be present at startup
    #[serde(default)]
    pub preload_models: Vec<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_comfy_host() -> String {
    "127.0.0.1:8188".to_string()
}

fn default_api_available_interval_ms() -> u64 {
    50
}

fn default_api_available_max_retries() -> u32 {
    500
}

fn default_polling_interval_ms() -> u64 {
    250
}

fn default_polling_max_retries() -> u32 {
    500
}

fn default_output_path() -> PathBuf {
    PathBuf::from("/comfyui/output")
}

fn default_bucket_name() -> String {
    "comfy-outputs".to_string()
}

fn default_worker_concurrency() -> usize {
    1
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("/runpod-volume/models/checkpoints")
}

/// Credentials for the optional output bucket.
#[derive(Debug, Clone)]
pub struct BucketSettings {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: WorkerConfig = envy::from_env()?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.worker_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "WORKER_CONCURRENCY must be at least 1".to_string(),
            ));
        }
        if self.bucket_endpoint().is_some()
            && (self.bucket_access_key_id.is_none() || self.bucket_secret_access_key.is_none())
        {
            return Err(ConfigError::Invalid(
                "BUCKET_ACCESS_KEY_ID and BUCKET_SECRET_ACCESS_KEY are required when BUCKET_ENDPOINT_URL is set"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL of the ComfyUI HTTP API.
    pub fn comfy_base_url(&self) -> String {
        format!("http://{}", self.comfy_host)
    }

    pub fn availability_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(self.comfy_api_available_interval_ms),
            self.comfy_api_available_max_retries,
        )
    }

    pub fn polling_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(self.comfy_polling_interval_ms),
            self.comfy_polling_max_retries,
        )
    }

    fn bucket_endpoint(&self) -> Option<&str> {
        self.bucket_endpoint_url
            .as_deref()
            .filter(|endpoint| !endpoint.is_empty())
    }

    /// Bucket settings, present only when an endpoint is configured.
    pub fn bucket(&self) -> Option<BucketSettings> {
        let endpoint = self.bucket_endpoint()?;
        Some(BucketSettings {
            endpoint: endpoint.to_string(),
            bucket: self.bucket_name.clone(),
            access_key: self.bucket_access_key_id.clone()?,
            secret_key: self.bucket_secret_access_key.clone()?,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
