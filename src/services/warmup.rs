//! Best-effort startup checks run before the worker accepts jobs.

use std::path::Path;
use std::time::Duration;

use crate::services::comfy::RenderBackend;
use crate::services::retry::RetryPolicy;

/// What the warmup found. Nothing here blocks job processing.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct WarmupReport {
    pub backend_ready: bool,
    pub available: Vec<String>,
    pub preloaded: Vec<String>,
    pub missing: Vec<String>,
}

/// Wait `delay`, probe the backend, and check which of `preload` exist in
/// `models_dir`.
pub async fn warm_up(
    backend: &dyn RenderBackend,
    policy: &RetryPolicy,
    delay: Duration,
    models_dir: &Path,
    preload: &[String],
) -> WarmupReport {
    if !delay.is_zero() {
        tracing::info!(delay_secs = delay.as_secs(), "Waiting for ComfyUI to initialize");
        tokio::time::sleep(delay).await;
    }

    let backend_ready = backend.probe(policy).await;

    let available = match list_models(models_dir).await {
        Ok(models) => {
            tracing::info!(dir = %models_dir.display(), ?models, "Available models");
            models
        }
        Err(e) => {
            tracing::warn!(dir = %models_dir.display(), error = %e, "Model directory not readable");
            Vec::new()
        }
    };

    let (preloaded, missing): (Vec<_>, Vec<_>) = preload
        .iter()
        .cloned()
        .partition(|name| available.contains(name));

    for name in &missing {
        tracing::error!(model = %name, dir = %models_dir.display(), "Model file not found");
    }
    tracing::info!(count = preloaded.len(), ?preloaded, "Checked preload models");

    WarmupReport {
        backend_ready,
        available,
        preloaded,
        missing,
    }
}

async fn list_models(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut models = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            models.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    models.sort();
    Ok(models)
}
