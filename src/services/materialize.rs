use base64::Engine;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::models::history::{HistoryEntry, OutputFile};
use crate::models::response::{ProcessingResult, StepStatus};
use crate::services::storage::ArtifactStore;

/// Turns backend output file references into artifact references.
#[derive(Clone)]
pub struct ResultMaterializer {
    output_root: PathBuf,
    artifacts: Option<Arc<dyn ArtifactStore>>,
}

impl ResultMaterializer {
    /// Materializer returning images inline as base64.
    pub fn inline(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            artifacts: None,
        }
    }

    /// Materializer uploading images to `artifacts` and returning their URLs.
    pub fn uploading(output_root: impl Into<PathBuf>, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self {
            output_root: output_root.into(),
            artifacts: Some(artifacts),
        }
    }

    /// Local path of an output file, or `None` if the reference would
    /// leave the output root.
    fn resolve(&self, file: &OutputFile) -> Option<PathBuf> {
        let relative = Path::new(&file.subfolder).join(&file.filename);
        let escapes = relative.components().any(|c| {
            matches!(c, Component::RootDir | Component::ParentDir | Component::Prefix(_))
        });
        (!escapes).then(|| self.output_root.join(relative))
    }

    /// Produce one artifact reference per output file, in output order.
    ///
    /// A file that does not exist, or whose reference points outside the
    /// output root, yields an `Image not found: <path>` placeholder and the
    /// result stays `success`. Read or upload errors on an existing file make
    /// the whole result an error.
    pub async fn process_outputs(&self, outputs: &HistoryEntry, job_id: &str) -> ProcessingResult {
        let files = outputs.output_files();
        tracing::info!(job_id, count = files.len(), "Image generation completed");

        let mut artifacts = Vec::with_capacity(files.len());
        for file in files {
            let Some(path) = self.resolve(&file) else {
                let reference = Path::new(&file.subfolder).join(&file.filename);
                tracing::warn!(job_id, reference = %reference.display(), "Output reference outside output root");
                artifacts.push(format!("Image not found: {}", reference.display()));
                continue;
            };
            tracing::info!(job_id, path = %path.display(), "Processing image");

            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                tracing::error!(job_id, path = %path.display(), "Image not found");
                artifacts.push(format!("Image not found: {}", path.display()));
                continue;
            }

            let artifact = match &self.artifacts {
                Some(store) => store.put_artifact(job_id, &path).await.map_err(|e| e.to_string()),
                None => tokio::fs::read(&path)
                    .await
                    .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes))
                    .map_err(|e| e.to_string()),
            };

            match artifact {
                Ok(artifact) => artifacts.push(artifact),
                Err(e) => {
                    tracing::error!(job_id, path = %path.display(), error = %e, "Failed to materialize image");
                    return ProcessingResult {
                        status: StepStatus::Error,
                        message: vec![e],
                    };
                }
            }
        }

        ProcessingResult {
            status: StepStatus::Success,
            message: artifacts,
        }
    }
}
