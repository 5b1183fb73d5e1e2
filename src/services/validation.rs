//! Input validation for incoming render jobs.
//!
//! Checks the shape of a job's `input` before anything touches the backend
//! or the state store. Pure: no I/O.

use serde_json::Value;

use crate::models::request::{ImageInput, ValidatedRequest};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("no input provided")]
    MissingInput,

    #[error("invalid JSON format in input")]
    InvalidFormat,

    #[error("missing 'workflow' parameter")]
    MissingWorkflow,

    #[error("invalid JSON format in workflow")]
    InvalidWorkflow,

    #[error("'images' must be a list of objects with 'name' and 'image' keys")]
    InvalidImages,
}

/// Validate a raw job input and split it into workflow and images.
///
/// String input is parsed as JSON first. A workflow given as a string is
/// parsed as well; anything else is passed through untouched.
pub fn validate_input(raw: &Value) -> Result<ValidatedRequest, ValidationError> {
    let parsed;
    let input = match raw {
        Value::Null => return Err(ValidationError::MissingInput),
        Value::String(text) => {
            parsed = serde_json::from_str::<Value>(text)
                .map_err(|_| ValidationError::InvalidFormat)?;
            &parsed
        }
        other => other,
    };

    let fields = input.as_object().ok_or(ValidationError::InvalidFormat)?;

    let workflow = match fields.get("workflow") {
        None | Some(Value::Null) => return Err(ValidationError::MissingWorkflow),
        Some(Value::String(text)) => {
            serde_json::from_str(text).map_err(|_| ValidationError::InvalidWorkflow)?
        }
        Some(workflow) => workflow.clone(),
    };

    let images = match fields.get("images") {
        None | Some(Value::Null) => Vec::new(),
        Some(images) => parse_images(images)?,
    };

    Ok(ValidatedRequest { workflow, images })
}

fn parse_images(value: &Value) -> Result<Vec<ImageInput>, ValidationError> {
    let items = value.as_array().ok_or(ValidationError::InvalidImages)?;
    items
        .iter()
        .map(|item| {
            let name = item.get("name").and_then(Value::as_str);
            let image = item.get("image").and_then(Value::as_str);
            match (name, image) {
                (Some(name), Some(image)) => Ok(ImageInput {
                    name: name.to_string(),
                    image: image.to_string(),
                }),
                _ => Err(ValidationError::InvalidImages),
            }
        })
        .collect()
}
