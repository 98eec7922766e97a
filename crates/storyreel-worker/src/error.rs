//! Worker error types.

use storyreel_client::{ClientError, ParseError};
use storyreel_media::MediaError;
use storyreel_models::ItemId;
use storyreel_storage::StorageError;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Outcome of a retried generative call that produced nothing.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation cancelled")]
    Cancelled,

    #[error("Generation failed after {attempts} attempts: {source}")]
    Failed {
        attempts: u32,
        #[source]
        source: ClientError,
    },
}

impl GenerationError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GenerationError::Cancelled)
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Search term is empty")]
    EmptySearchTerm,

    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("Not enough new candidates: found {found}, need {required}")]
    InsufficientCandidates { found: usize, required: usize },

    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("Script is not ready for item {0}")]
    ScriptNotReady(ItemId),

    #[error("Scene prompts missing for item {0}")]
    ScenePromptsMissing(ItemId),

    #[error("Invalid scene index {index} (item has {scene_count} scenes)")]
    InvalidSceneIndex { index: usize, scene_count: usize },

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),
}

impl WorkerError {
    pub fn search_failed(msg: impl Into<String>) -> Self {
        Self::SearchFailed(msg.into())
    }

    /// Errors that abort a whole batch rather than a single item.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            WorkerError::EmptySearchTerm
                | WorkerError::SearchFailed(_)
                | WorkerError::InsufficientCandidates { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkerError::Generation(GenerationError::Cancelled))
    }
}
