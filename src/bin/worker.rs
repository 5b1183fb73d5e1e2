use comfy_job_worker::{
    app_state::AppState,
    config::WorkerConfig,
    services::{warmup, worker::JobWorker},
};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL_MS: u64 = 1000; // 1 second

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting ComfyUI job worker");

    let config = WorkerConfig::from_env().expect("Failed to load configuration");
    let state = AppState::from_config(&config).expect("Failed to initialize services");

    let report = warmup::warm_up(
        state.backend.as_ref(),
        &config.availability_policy(),
        Duration::from_secs(config.startup_delay_secs),
        &config.models_dir,
        &config.preload_models,
    )
    .await;
    if !report.backend_ready {
        tracing::warn!("ComfyUI not reachable at startup, jobs will keep probing");
    }

    tracing::info!(
        concurrency = config.worker_concurrency,
        "Worker ready, starting job processing loop"
    );

    let worker = JobWorker::new(
        state.queue.clone(),
        state.orchestrator.clone(),
        config.worker_concurrency,
        Duration::from_millis(POLL_INTERVAL_MS),
    );
    let processed = worker.run().await;

    tracing::info!(processed, "Worker stopped");
}
