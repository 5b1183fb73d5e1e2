//! Shapes returned by the ComfyUI `/history/{prompt_id}` endpoint.

use serde::{Deserialize, Serialize};

/// History of a single prompt.
///
/// `outputs` maps node id to that node's output. Key order follows the
/// backend's response, which decides the order of the returned artifacts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub outputs: serde_json::Map<String, serde_json::Value>,
}

/// Output of one workflow node. Nodes that produce no images are skipped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeOutput {
    #[serde(default)]
    pub images: Vec<OutputFile>,
}

/// A file written by the backend into its output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFile {
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl HistoryEntry {
    /// Generation is finished once the backend reports any outputs.
    pub fn is_complete(&self) -> bool {
        !self.outputs.is_empty()
    }

    /// Every output file across all nodes, flattened in node order.
    ///
    /// A node whose `images` cannot be read is skipped with a warning.
    pub fn output_files(&self) -> Vec<OutputFile> {
        self.outputs
            .iter()
            .filter_map(|(node_id, node)| {
                match serde_json::from_value::<NodeOutput>(node.clone()) {
                    Ok(node) => Some(node),
                    Err(e) => {
                        tracing::warn!(node_id = %node_id, error = %e, "Skipping malformed node output");
                        None
                    }
                }
            })
            .flat_map(|node| node.images)
            .collect()
    }
}
