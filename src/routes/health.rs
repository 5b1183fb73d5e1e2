use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;
use crate::services::comfy::RenderBackend;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub redis: ComponentHealth,
    pub comfyui: ComponentHealth,
    pub queue_depth: Option<u64>,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub latency_ms: Option<u64>,
}

impl ComponentHealth {
    fn ok(start: std::time::Instant) -> Self {
        Self {
            status: "ok".to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
        }
    }

    fn error() -> Self {
        Self {
            status: "error".to_string(),
            latency_ms: None,
        }
    }
}

/// GET /health — Redis and ComfyUI reachability.
///
/// ComfyUI gets a single check here; the retrying probe is reserved for jobs.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let redis_start = std::time::Instant::now();
    let redis_check = match state.store.health_check().await {
        Ok(()) => ComponentHealth::ok(redis_start),
        Err(_) => ComponentHealth::error(),
    };

    let comfy_start = std::time::Instant::now();
    let comfy_check = match state.backend.ping().await {
        Ok(true) => ComponentHealth::ok(comfy_start),
        _ => ComponentHealth::error(),
    };

    let queue_depth = state.queue.queue_depth().await.ok();
    if let Some(depth) = queue_depth {
        metrics::gauge!("render_queue_depth").set(depth as f64);
    }

    let all_healthy = redis_check.status == "ok" && comfy_check.status == "ok";
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if all_healthy {
            "ok".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            redis: redis_check,
            comfyui: comfy_check,
            queue_depth,
        },
    };

    (status_code, Json(response))
}
