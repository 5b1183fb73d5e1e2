use axum::extract::DefaultBodyLimit;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use comfy_job_worker::{app_state::AppState, config::WorkerConfig, routes};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = WorkerConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!(comfy_host = %config.comfy_host, "Initializing comfy-job-worker server");

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    metrics::describe_counter!("render_jobs_total", "Render jobs started");
    metrics::describe_counter!("render_jobs_completed_total", "Render jobs that reached COMPLETED");
    metrics::describe_counter!(
        "render_jobs_failed_total",
        "Render jobs that reached FAILED, by reason"
    );
    metrics::describe_counter!("render_jobs_enqueued_total", "Jobs handed to the worker queue");
    metrics::describe_counter!(
        "job_record_failures_total",
        "Job record writes that could not be persisted"
    );
    metrics::describe_histogram!(
        "render_job_duration_seconds",
        "Time from job start to terminal state"
    );
    metrics::describe_gauge!("render_queue_depth", "Jobs waiting in the worker queue");

    let state = AppState::from_config(&config).expect("Failed to initialize application state");

    // Generated workflows with inline images can be large
    let app = routes::router(state, prometheus_handle)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(50 * 1024 * 1024));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
