//! Content item: the working record for one selected candidate.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Candidate, ItemId, JobId, MediaRef, VideoStats};

/// Default number of scenes (markers, prompts and image slots) per item.
pub const DEFAULT_SCENE_COUNT: usize = 10;

/// Reserved placeholder strings.
pub mod sentinel {
    /// Analysis not produced yet.
    pub const ANALYSIS_PENDING: &str = "Analysis pending...";
    /// Script not produced yet.
    pub const SCRIPT_PENDING: &str = "Analyzing content...";
    /// Emitted by the model when the source material is insufficient.
    pub const NO_CONTENT_ANALYSIS: &str = "There is nothing to analyze.";
    /// Emitted by the model when the source material is insufficient.
    pub const NO_CONTENT_SCRIPT: &str = "No content";
    /// Response parsed but carried no analysis.
    pub const ANALYSIS_UNAVAILABLE: &str = "Analysis unavailable or failed.";
    /// Response parsed but carried no script.
    pub const SCRIPT_BAD_FORMAT: &str =
        "Script generation failed: response was not in the expected format.";
    /// The analysis call itself failed.
    pub const ANALYSIS_FAILED: &str = "Analysis failed";
    /// The script call itself failed.
    pub const SCRIPT_FAILED: &str = "Script generation failed";
    /// Filler for missing scene prompts in a parsed response.
    pub const PLACEHOLDER_SCENE_PROMPT: &str = "scenic background";
    /// Scene prompt used for every scene when the call failed.
    pub const FAILED_SCENE_PROMPT: &str = "minimalist stick figure";
}

/// A generated text field (analysis or script).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(tag = "state", content = "text", rename_all = "snake_case")]
pub enum GeneratedText {
    /// Not produced yet
    #[default]
    Pending,
    /// Real generated content
    Ready(String),
    /// The generator judged the source insufficient
    NoContent,
    /// Generation failed; carries the failure text shown in place of content
    Failed(String),
}

impl GeneratedText {
    /// Classify a model-provided value.
    ///
    /// `no_content` is the exact sentinel the model was told to emit; `missing`
    /// is the failure text used when the value is absent or blank.
    pub fn classify(raw: Option<&str>, no_content: &str, missing: &str) -> Self {
        match raw.map(str::trim) {
            None | Some("") => GeneratedText::Failed(missing.to_string()),
            Some(text) if text.eq_ignore_ascii_case(no_content) => GeneratedText::NoContent,
            Some(text) => GeneratedText::Ready(text.to_string()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, GeneratedText::Ready(_))
    }

    /// Text if ready.
    pub fn ready_text(&self) -> Option<&str> {
        match self {
            GeneratedText::Ready(text) => Some(text),
            _ => None,
        }
    }

    fn display<'a>(&'a self, pending: &'a str, no_content: &'a str) -> &'a str {
        match self {
            GeneratedText::Pending => pending,
            GeneratedText::Ready(text) => text,
            GeneratedText::NoContent => no_content,
            GeneratedText::Failed(text) => text,
        }
    }
}

/// Ordered scene descriptions, always exactly `scene_count` long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ScenePrompts(Vec<String>);

impl ScenePrompts {
    /// Truncate or pad `raw` to exactly `scene_count` entries.
    ///
    /// Blank entries are replaced by `filler` as well.
    pub fn normalize(raw: Vec<String>, scene_count: usize, filler: &str) -> Self {
        let mut prompts: Vec<String> = raw
            .into_iter()
            .take(scene_count)
            .map(|p| {
                let trimmed = p.trim();
                if trimmed.is_empty() {
                    filler.to_string()
                } else {
                    trimmed.to_string()
                }
            })
            .collect();
        prompts.resize(scene_count, filler.to_string());
        Self(prompts)
    }

    /// The same prompt for every scene.
    pub fn uniform(scene_count: usize, prompt: &str) -> Self {
        Self(vec![prompt.to_string(); scene_count])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// One illustration slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(tag = "state", content = "image", rename_all = "snake_case")]
pub enum SceneSlot {
    #[default]
    Empty,
    /// Claimed by the job rendering it
    InProgress { job_id: JobId },
    Ready(MediaRef),
}

impl SceneSlot {
    pub fn in_progress(job_id: &JobId) -> Self {
        SceneSlot::InProgress {
            job_id: job_id.clone(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SceneSlot::Ready(_))
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, SceneSlot::InProgress { .. })
    }

    /// Whether `job_id` holds the in-progress claim on this slot.
    pub fn is_claimed_by(&self, job_id: &JobId) -> bool {
        matches!(self, SceneSlot::InProgress { job_id: owner } if owner == job_id)
    }

    pub fn media(&self) -> Option<&MediaRef> {
        match self {
            SceneSlot::Ready(media) => Some(media),
            _ => None,
        }
    }
}

/// Narration audio state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(tag = "state", content = "audio", rename_all = "snake_case")]
pub enum AudioState {
    #[default]
    Absent,
    InProgress { job_id: JobId },
    Ready(MediaRef),
}

impl AudioState {
    pub fn in_progress(job_id: &JobId) -> Self {
        AudioState::InProgress {
            job_id: job_id.clone(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, AudioState::Ready(_))
    }

    pub fn is_claimed_by(&self, job_id: &JobId) -> bool {
        matches!(self, AudioState::InProgress { job_id: owner } if owner == job_id)
    }

    pub fn media(&self) -> Option<&MediaRef> {
        match self {
            AudioState::Ready(media) => Some(media),
            _ => None,
        }
    }
}

/// Forward-only pipeline stage of an item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ItemStage {
    /// Materialized from the selected candidate
    #[default]
    Selected,
    /// Stats lookup finished (resolved or not)
    StatsResolved,
    /// Analysis recorded
    Analyzed,
    /// Script and scene prompts recorded
    Scripted,
}

impl ItemStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStage::Selected => "selected",
            ItemStage::StatsResolved => "stats_resolved",
            ItemStage::Analyzed => "analyzed",
            ItemStage::Scripted => "scripted",
        }
    }
}

/// The full working record for one selected candidate.
///
/// `images` is sized once at construction and only ever changes slot by slot.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ContentItem {
    /// Item ID (the candidate's external ID)
    pub id: ItemId,

    pub title: String,

    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    pub published_at: DateTime<Utc>,

    /// Engagement snapshot
    pub stats: VideoStats,

    /// Current pipeline stage
    pub stage: ItemStage,

    pub analysis: GeneratedText,

    /// Narration with inline `[k]` scene markers
    pub script: GeneratedText,

    scene_prompts: Option<ScenePrompts>,

    images: Vec<SceneSlot>,

    pub audio: AudioState,
}

impl ContentItem {
    /// Create a pending item for a selected candidate.
    pub fn from_candidate(candidate: &Candidate, scene_count: usize) -> Self {
        Self {
            id: candidate.id.clone(),
            title: candidate.title.clone(),
            description: candidate.description.clone(),
            thumbnail_url: candidate.thumbnail_url.clone(),
            published_at: candidate.published_at,
            stats: VideoStats::unknown(),
            stage: ItemStage::Selected,
            analysis: GeneratedText::Pending,
            script: GeneratedText::Pending,
            scene_prompts: None,
            images: vec![SceneSlot::Empty; scene_count],
            audio: AudioState::Absent,
        }
    }

    /// Number of scenes this item was created with.
    pub fn scene_count(&self) -> usize {
        self.images.len()
    }

    /// Move the stage forward; earlier stages are ignored.
    pub fn advance_to(&mut self, stage: ItemStage) {
        if stage > self.stage {
            self.stage = stage;
        }
    }

    pub fn scene_prompts(&self) -> Option<&ScenePrompts> {
        self.scene_prompts.as_ref()
    }

    /// Record scene prompts. Rejected unless sized to this item's scene count.
    pub fn set_scene_prompts(&mut self, prompts: ScenePrompts) -> bool {
        if prompts.len() != self.images.len() {
            return false;
        }
        self.scene_prompts = Some(prompts);
        true
    }

    pub fn images(&self) -> &[SceneSlot] {
        &self.images
    }

    pub fn image(&self, index: usize) -> Option<&SceneSlot> {
        self.images.get(index)
    }

    /// Keyed write of a single image slot. Out-of-range indices are rejected.
    pub fn set_image(&mut self, index: usize, slot: SceneSlot) -> bool {
        match self.images.get_mut(index) {
            Some(current) => {
                *current = slot;
                true
            }
            None => false,
        }
    }

    pub fn ready_image_count(&self) -> usize {
        self.images.iter().filter(|s| s.is_ready()).count()
    }

    pub fn is_scripted(&self) -> bool {
        self.stage >= ItemStage::Scripted
    }

    /// Analysis text as shown to the consumer.
    pub fn analysis_display(&self) -> &str {
        self.analysis
            .display(sentinel::ANALYSIS_PENDING, sentinel::NO_CONTENT_ANALYSIS)
    }

    /// Script text as shown to the consumer (markers not yet rendered).
    pub fn script_display(&self) -> &str {
        self.script
            .display(sentinel::SCRIPT_PENDING, sentinel::NO_CONTENT_SCRIPT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item() -> ContentItem {
        let candidate = Candidate::new(
            "vid1",
            "Title",
            "Description",
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        );
        ContentItem::from_candidate(&candidate, DEFAULT_SCENE_COUNT)
    }

    #[test]
    fn test_new_item_is_pending() {
        let item = item();
        assert_eq!(item.stage, ItemStage::Selected);
        assert_eq!(item.images().len(), DEFAULT_SCENE_COUNT);
        assert!(item.images().iter().all(|s| *s == SceneSlot::Empty));
        assert_eq!(item.analysis_display(), sentinel::ANALYSIS_PENDING);
        assert_eq!(item.script_display(), sentinel::SCRIPT_PENDING);
        assert_eq!(item.stats.views.to_string(), "-");
    }

    #[test]
    fn test_set_image_never_resizes() {
        let mut item = item();
        let media = MediaRef::new("k", "image/png", 3);

        assert!(item.set_image(3, SceneSlot::Ready(media.clone())));
        assert!(!item.set_image(DEFAULT_SCENE_COUNT, SceneSlot::Ready(media)));
        assert_eq!(item.images().len(), DEFAULT_SCENE_COUNT);
        assert!(item.image(3).unwrap().is_ready());
        assert_eq!(item.ready_image_count(), 1);
    }

    #[test]
    fn test_stage_is_forward_only() {
        let mut item = item();
        item.advance_to(ItemStage::Scripted);
        item.advance_to(ItemStage::StatsResolved);
        assert_eq!(item.stage, ItemStage::Scripted);
        assert!(item.is_scripted());
    }

    #[test]
    fn test_scene_prompts_normalize() {
        let padded = ScenePrompts::normalize(vec!["a".into(), "  ".into()], 4, "filler");
        assert_eq!(padded.as_slice(), &["a", "filler", "filler", "filler"]);

        let truncated = ScenePrompts::normalize((0..12).map(|i| i.to_string()).collect(), 10, "x");
        assert_eq!(truncated.len(), 10);
        assert_eq!(truncated.get(9), Some("9"));
    }

    #[test]
    fn test_set_scene_prompts_requires_matching_len() {
        let mut item = item();
        assert!(!item.set_scene_prompts(ScenePrompts::uniform(3, "x")));
        assert!(item.scene_prompts().is_none());
        assert!(item.set_scene_prompts(ScenePrompts::uniform(DEFAULT_SCENE_COUNT, "x")));
    }

    #[test]
    fn test_generated_text_classify() {
        let no_content = sentinel::NO_CONTENT_SCRIPT;
        let missing = sentinel::SCRIPT_BAD_FORMAT;

        assert_eq!(
            GeneratedText::classify(Some("No content"), no_content, missing),
            GeneratedText::NoContent
        );
        assert_eq!(
            GeneratedText::classify(Some("  "), no_content, missing),
            GeneratedText::Failed(missing.to_string())
        );
        assert_eq!(
            GeneratedText::classify(None, no_content, missing),
            GeneratedText::Failed(missing.to_string())
        );
        assert_eq!(
            GeneratedText::classify(Some(" Real script [1] "), no_content, missing),
            GeneratedText::Ready("Real script [1]".to_string())
        );
    }
}
