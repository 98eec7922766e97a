//! Pipeline event schema published to presentation-layer subscribers.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Serialize;

use crate::{AudioState, ContentItem, ItemId, JobId, JobKind, JobStatus, SceneSlot, VideoStats};

/// Event envelope, serialized with a `type` tag.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Log message with timestamp
    Log {
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A new search started
    BatchStarted {
        #[serde(rename = "searchTerm")]
        search_term: String,
    },

    /// Selected items in their pending shape
    ItemsSelected { items: Vec<ContentItem> },

    /// Stats lookup result for one item
    StatsResolved {
        #[serde(rename = "itemId")]
        item_id: ItemId,
        stats: VideoStats,
    },

    /// Full item snapshot after a text stage completed
    ItemUpdated { item: ContentItem },

    /// Analyze+Script progress
    Progress { completed: usize, total: usize },

    /// Keyed image slot write
    SlotUpdated {
        #[serde(rename = "itemId")]
        item_id: ItemId,
        index: usize,
        slot: SceneSlot,
    },

    /// Narration audio state change
    AudioUpdated {
        #[serde(rename = "itemId")]
        item_id: ItemId,
        audio: AudioState,
    },

    /// Generation job lifecycle
    JobStatusChanged {
        #[serde(rename = "itemId")]
        item_id: ItemId,
        #[serde(rename = "jobId")]
        job_id: JobId,
        kind: JobKind,
        status: JobStatus,
    },

    /// One-shot user notification (e.g. a failed regeneration)
    Notification {
        #[serde(rename = "itemId")]
        item_id: ItemId,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Batch-fatal error
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Analyze+Script finished for the batch
    Done { completed: usize, total: usize },
}

impl PipelineEvent {
    /// Create a log message.
    pub fn log(message: impl Into<String>) -> Self {
        PipelineEvent::Log {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a progress message.
    pub fn progress(completed: usize, total: usize) -> Self {
        PipelineEvent::Progress {
            completed: completed.min(total),
            total,
        }
    }

    /// Create a notification for one item.
    pub fn notification(item_id: ItemId, message: impl Into<String>) -> Self {
        PipelineEvent::Notification {
            item_id,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an error message with technical details.
    pub fn error(message: impl Into<String>, details: impl Into<String>) -> Self {
        let now = Utc::now();
        let ts = now.format("%H:%M:%S").to_string();
        PipelineEvent::Error {
            message: format!("[{}] {}", ts, message.into()),
            details: Some(details.into()),
            timestamp: now,
        }
    }

    /// Create a slot update.
    pub fn slot(item_id: ItemId, index: usize, slot: SceneSlot) -> Self {
        PipelineEvent::SlotUpdated {
            item_id,
            index,
            slot,
        }
    }

    /// Create a job status change.
    pub fn job_status(item_id: ItemId, job_id: JobId, kind: JobKind, status: JobStatus) -> Self {
        PipelineEvent::JobStatusChanged {
            item_id,
            job_id,
            kind,
            status,
        }
    }

    /// Event type name as serialized.
    pub fn type_name(&self) -> &'static str {
        match self {
            PipelineEvent::Log { .. } => "log",
            PipelineEvent::BatchStarted { .. } => "batch_started",
            PipelineEvent::ItemsSelected { .. } => "items_selected",
            PipelineEvent::StatsResolved { .. } => "stats_resolved",
            PipelineEvent::ItemUpdated { .. } => "item_updated",
            PipelineEvent::Progress { .. } => "progress",
            PipelineEvent::SlotUpdated { .. } => "slot_updated",
            PipelineEvent::AudioUpdated { .. } => "audio_updated",
            PipelineEvent::JobStatusChanged { .. } => "job_status_changed",
            PipelineEvent::Notification { .. } => "notification",
            PipelineEvent::Error { .. } => "error",
            PipelineEvent::Done { .. } => "done",
        }
    }

    /// Whether this event ends a batch stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineEvent::Done { .. } | PipelineEvent::Error { .. })
    }
}
