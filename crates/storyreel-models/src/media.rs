//! References to generated binary artifacts.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A fetchable reference to bytes held by the artifact store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct MediaRef {
    /// Storage key
    pub key: String,
    /// MIME type of the stored bytes
    pub mime_type: String,
    /// Size in bytes
    pub byte_len: u64,
}

impl MediaRef {
    pub fn new(key: impl Into<String>, mime_type: impl Into<String>, byte_len: u64) -> Self {
        Self {
            key: key.into(),
            mime_type: mime_type.into(),
            byte_len,
        }
    }
}

/// Prefix holding every artifact of an item.
pub fn item_prefix(item_id: &str) -> String {
    format!("items/{}/", item_id)
}

/// Storage key for a scene image written by `job_id`.
///
/// Scenes are numbered from 1 in keys to match script markers. Keys are
/// unique per job.
pub fn scene_image_key(item_id: &str, scene_index: usize, job_id: &str, extension: &str) -> String {
    format!(
        "{}scene_{:02}_{}.{}",
        item_prefix(item_id),
        scene_index + 1,
        job_id,
        extension
    )
}

/// Storage key for narration audio written by `job_id`.
pub fn narration_key(item_id: &str, job_id: &str) -> String {
    format!("{}narration_{}.wav", item_prefix(item_id), job_id)
}
