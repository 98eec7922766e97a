//! Shared data models for the StoryReel pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Search candidates and engagement stats
//! - Content items, scene slots and narration state
//! - Image styles
//! - Generation job descriptors
//! - Pipeline event schemas
//! - Script marker rendering

pub mod candidate;
pub mod event;
pub mod item;
pub mod job;
pub mod media;
pub mod script;
pub mod stats;
pub mod style;

// Re-export common types
pub use candidate::{sort_by_recency, Candidate, ItemId};
pub use event::PipelineEvent;
pub use item::{
    sentinel, AudioState, ContentItem, GeneratedText, ItemStage, SceneSlot, ScenePrompts,
    DEFAULT_SCENE_COUNT,
};
pub use job::{JobId, JobKind, JobStatus};
pub use media::{item_prefix, narration_key, scene_image_key, MediaRef};
pub use script::{marker_scenes, render_script, ScriptSegment};
pub use stats::{StatValue, VideoStats, UNKNOWN_STAT};
pub use style::{AspectRatio, ImageStyle};
