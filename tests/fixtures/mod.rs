//! Payloads shared by the integration tests

use base64::Engine;
use serde_json::{json, Value};

/// Smallest valid PNG: a single transparent pixel.
pub const PIXEL_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

pub fn pixel_png_base64() -> String {
    base64::engine::general_purpose::STANDARD.encode(PIXEL_PNG)
}

/// A minimal text-to-image graph.
pub fn workflow() -> Value {
    json!({
        "3": {
            "class_type": "KSampler",
            "inputs": {"seed": 42, "steps": 4, "cfg": 1.5, "model": ["4", 0]}
        },
        "4": {
            "class_type": "CheckpointLoaderSimple",
            "inputs": {"ckpt_name": "realvisxlV40_v40LightningBakedvae.safetensors"}
        },
        "9": {
            "class_type": "SaveImage",
            "inputs": {"filename_prefix": "ComfyUI", "images": ["8", 0]}
        }
    })
}

/// `outputs` of a history entry listing the given `(subfolder, filename)` pairs.
pub fn outputs(files: &[(&str, &str)]) -> Value {
    let images: Vec<Value> = files
        .iter()
        .map(|(subfolder, filename)| {
            json!({"filename": filename, "subfolder": subfolder, "type": "output"})
        })
        .collect();
    json!({ "9": { "images": images } })
}
