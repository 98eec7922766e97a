//! Worker configuration.

use std::time::Duration;

use storyreel_client::SearchQuery;
use storyreel_models::{ImageStyle, DEFAULT_SCENE_COUNT};

use crate::retry::RetryPolicy;

/// Number of candidates selected per batch.
pub const SELECTION_SIZE: usize = 4;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Scenes per item (markers, prompts and image slots)
    pub scene_count: usize,
    /// Attempts per generative call, including the first
    pub generation_max_attempts: u32,
    /// Linear backoff unit between attempts
    pub generation_base_delay: Duration,
    pub search_region: String,
    pub search_language: String,
    pub search_max_results: u32,
    /// Default style when a job does not name one
    pub image_style: ImageStyle,
    /// Description characters sent to the analysis prompt
    pub description_prompt_limit: usize,
    /// Language of the generated analysis and narration
    pub narration_language: String,
    pub progress_channel_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            scene_count: DEFAULT_SCENE_COUNT,
            generation_max_attempts: 3,
            generation_base_delay: Duration::from_secs(1),
            search_region: "KR".to_string(),
            search_language: "ko".to_string(),
            search_max_results: 20,
            image_style: ImageStyle::Doodle,
            description_prompt_limit: 3000,
            narration_language: "Korean".to_string(),
            progress_channel_capacity: 256,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            scene_count: std::env::var("SCENE_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.scene_count),
            generation_max_attempts: std::env::var("GENERATION_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.generation_max_attempts),
            generation_base_delay: Duration::from_millis(
                std::env::var("GENERATION_BASE_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            search_region: std::env::var("SEARCH_REGION").unwrap_or(defaults.search_region),
            search_language: std::env::var("SEARCH_LANGUAGE").unwrap_or(defaults.search_language),
            search_max_results: std::env::var("SEARCH_MAX_RESULTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.search_max_results),
            image_style: std::env::var("IMAGE_STYLE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.image_style),
            description_prompt_limit: std::env::var("DESCRIPTION_PROMPT_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.description_prompt_limit),
            narration_language: std::env::var("NARRATION_LANGUAGE")
                .unwrap_or(defaults.narration_language),
            progress_channel_capacity: std::env::var("PROGRESS_CHANNEL_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.progress_channel_capacity),
        }
    }

    /// Retry policy for every generative call.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_attempts(self.generation_max_attempts)
            .with_base_delay(self.generation_base_delay)
    }

    /// Search parameters for a term.
    pub fn search_query(&self, term: &str) -> SearchQuery {
        SearchQuery {
            query: term.trim().to_string(),
            region: self.search_region.clone(),
            language: self.search_language.clone(),
            max_results: self.search_max_results,
        }
    }
}
