use serde::{Deserialize, Serialize};

/// Job payload handed to the orchestrator by the hosting runtime.
///
/// `input` is kept as raw JSON: it may be an object, a JSON-encoded
/// string, or missing entirely, and the validator decides which.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub input: serde_json::Value,
}

/// One input image to upload before the workflow is queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInput {
    pub name: String,
    /// Base64-encoded image bytes.
    pub image: String,
}

/// Input that passed validation. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub workflow: serde_json::Value,
    pub images: Vec<ImageInput>,
}
