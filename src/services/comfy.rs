//! HTTP gateway to the local ComfyUI instance.
//!
//! Covers the four calls the orchestrator needs: availability check,
//! input image upload, workflow submission and history retrieval.

use async_trait::async_trait;
use reqwest::multipart;
use std::convert::Infallible;

use crate::models::history::HistoryEntry;
use crate::services::retry::{poll_until, RetryPolicy};

/// Operations the orchestrator performs against the rendering backend.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// One availability check. `Ok(true)` means the backend answered 200.
    async fn ping(&self) -> Result<bool, GatewayError>;

    /// Upload one input image, overwriting any file with the same name.
    async fn upload_asset(&self, name: &str, bytes: Vec<u8>) -> Result<(), GatewayError>;

    /// Queue a workflow and return the backend's prompt id.
    async fn submit(&self, workflow: &serde_json::Value) -> Result<String, GatewayError>;

    /// History for `prompt_id`, or `None` if the backend does not know it yet.
    async fn get_history(&self, prompt_id: &str) -> Result<Option<HistoryEntry>, GatewayError>;

    /// Wait for the backend to become reachable within `policy`.
    ///
    /// Transport errors and non-200 answers both count as a failed attempt.
    async fn probe(&self, policy: &RetryPolicy) -> bool {
        let ready = poll_until(policy, |attempt| async move {
            match self.ping().await {
                Ok(true) => Ok::<_, Infallible>(Some(())),
                Ok(false) => Ok(None),
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "ComfyUI API not reachable yet");
                    Ok(None)
                }
            }
        })
        .await;

        match ready {
            Ok(Some(())) => {
                tracing::info!("ComfyUI API is reachable");
                true
            }
            _ => {
                tracing::error!(
                    attempts = policy.max_attempts,
                    "Failed to reach ComfyUI API"
                );
                false
            }
        }
    }
}

/// reqwest client bound to a single ComfyUI base URL.
pub struct ComfyGateway {
    http: reqwest::Client,
    base_url: String,
}

impl ComfyGateway {
    /// `base_url` is the HTTP root of the instance, e.g. `http://127.0.0.1:8188`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Return the response unchanged on success, or an `Api` error carrying
    /// the status and body.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// Content type for an uploaded image, sniffed from its bytes.
fn image_content_type(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or("image/png")
}

#[async_trait]
impl RenderBackend for ComfyGateway {
    async fn ping(&self) -> Result<bool, GatewayError> {
        let response = self.http.get(format!("{}/", self.base_url)).send().await?;
        Ok(response.status() == reqwest::StatusCode::OK)
    }

    async fn upload_asset(&self, name: &str, bytes: Vec<u8>) -> Result<(), GatewayError> {
        let content_type = image_content_type(&bytes);
        let part = multipart::Part::bytes(bytes)
            .file_name(name.to_string())
            .mime_str(content_type)?;
        let form = multipart::Form::new()
            .part("image", part)
            .text("overwrite", "true");

        let response = self
            .http
            .post(format!("{}/upload/image", self.base_url))
            .multipart(form)
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api { status, body });
        }
        Ok(())
    }

    async fn submit(&self, workflow: &serde_json::Value) -> Result<String, GatewayError> {
        let body = serde_json::json!({ "prompt": workflow });

        let response = self
            .http
            .post(format!("{}/prompt", self.base_url))
            .json(&body)
            .send()
            .await?;

        let queued: serde_json::Value = Self::ensure_success(response).await?.json().await?;
        queued
            .get("prompt_id")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or(GatewayError::MissingPromptId)
    }

    async fn get_history(&self, prompt_id: &str) -> Result<Option<HistoryEntry>, GatewayError> {
        let response = self
            .http
            .get(format!("{}/history/{}", self.base_url, prompt_id))
            .send()
            .await?;

        let mut history: serde_json::Map<String, serde_json::Value> =
            Self::ensure_success(response).await?.json().await?;

        match history.remove(prompt_id) {
            Some(entry) => Ok(Some(serde_json::from_value(entry)?)),
            None => Ok(None),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ComfyUI API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("ComfyUI response did not contain a prompt_id")]
    MissingPromptId,

    #[error("Unexpected history format: {0}")]
    Parse(#[from] serde_json::Error),
}
