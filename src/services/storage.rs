use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use std::path::Path;

use crate::config::BucketSettings;

/// Presigned output URLs stay valid for a week.
const PRESIGN_EXPIRY_SECS: u32 = 7 * 24 * 60 * 60;

/// Destination for generated images when they are not returned inline.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Upload the file at `path` for `job_id` and return a URL for it.
    async fn put_artifact(&self, job_id: &str, path: &Path) -> Result<String, StorageError>;
}

/// Client for S3-compatible object storage.
pub struct BucketClient {
    bucket: Box<Bucket>,
}

impl BucketClient {
    pub fn new(settings: &BucketSettings) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: "auto".to_string(),
            endpoint: settings.endpoint.clone(),
        };

        let credentials = Credentials::new(
            Some(&settings.access_key),
            Some(&settings.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Config(e.to_string()))?;

        let bucket = Bucket::new(&settings.bucket, region, credentials)
            .map_err(|e| StorageError::Config(e.to_string()))?
            .with_path_style();

        Ok(Self { bucket })
    }

    /// Object key for an output file: `<job_id>/<file name>`.
    pub fn object_key(job_id: &str, path: &Path) -> String {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output.png".to_string());
        format!("{job_id}/{file_name}")
    }
}

#[async_trait]
impl ArtifactStore for BucketClient {
    async fn put_artifact(&self, job_id: &str, path: &Path) -> Result<String, StorageError> {
        let data = tokio::fs::read(path).await?;
        let content_type = image::guess_format(&data)
            .map(|format| format.to_mime_type())
            .unwrap_or("application/octet-stream");
        let key = Self::object_key(job_id, path);

        self.bucket
            .put_object_with_content_type(&key, &data, content_type)
            .await?;

        let url = self.bucket.presign_get(&key, PRESIGN_EXPIRY_SECS, None).await?;
        tracing::info!(job_id, key = %key, "Image uploaded to object storage");
        Ok(url)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("S3 operation failed: {0}")]
    S3(#[from] s3::error::S3Error),

    #[error("Failed to read output file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage configuration error: {0}")]
    Config(String),
}
