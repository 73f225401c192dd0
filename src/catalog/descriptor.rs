//! Model descriptor files.
//!
//! Every model in the catalog is one JSON file under
//! `{model_root}/{game}/`. Descriptor contents are deliberately not
//! cached: they are re-read each time a game is activated, so an edit on
//! disk shows up on the next activation without any invalidation
//! machinery.

use crate::error::{Result, VoxError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File extension of model descriptor files.
pub const DESCRIPTOR_EXT: &str = "json";

/// Metadata identifying one synthesis model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model identifier, unique within its game. Also names the directory
    /// segment for the model's weights and committed samples.
    pub id: String,
    /// Human-readable model name.
    pub name: String,
    /// Output channel count the server must configure the model with.
    pub outputs: u32,
    /// Optional pronunciation dictionary reference, `None` when the model
    /// ships without one.
    #[serde(default)]
    pub cmudict: Option<String>,
}

/// Read and parse one descriptor file.
///
/// # Errors
///
/// Returns [`VoxError::Descriptor`] if the file cannot be read or does not
/// parse as a descriptor.
pub fn read_descriptor(path: &Path) -> Result<ModelDescriptor> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| VoxError::Descriptor(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| VoxError::Descriptor(format!("cannot parse {}: {e}", path.display())))
}
