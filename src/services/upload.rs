use base64::Engine;

use crate::models::request::ImageInput;
use crate::models::response::StepOutcome;
use crate::services::comfy::RenderBackend;

/// Upload the job's input images to the backend before queuing.
///
/// Every image is attempted; failures are collected rather than returned
/// early, and any failure turns the whole step into an error.
pub async fn upload_images(backend: &dyn RenderBackend, images: &[ImageInput]) -> StepOutcome {
    if images.is_empty() {
        return StepOutcome::success("No images to upload", Vec::new());
    }

    tracing::info!(count = images.len(), "Starting image upload");

    let mut uploaded = Vec::new();
    let mut errors = Vec::new();

    for image in images {
        let blob = match base64::engine::general_purpose::STANDARD.decode(&image.image) {
            Ok(blob) => blob,
            Err(e) => {
                errors.push(format!("Error uploading {}: invalid base64 data: {}", image.name, e));
                continue;
            }
        };

        match backend.upload_asset(&image.name, blob).await {
            Ok(()) => uploaded.push(format!("Successfully uploaded {}", image.name)),
            Err(e) => errors.push(format!("Error uploading {}: {}", image.name, e)),
        }
    }

    if errors.is_empty() {
        tracing::info!("Image upload completed successfully");
        StepOutcome::success("All images uploaded successfully", uploaded)
    } else {
        tracing::error!(failed = errors.len(), "Image upload completed with errors");
        StepOutcome::error("Some images failed to upload", errors)
    }
}
