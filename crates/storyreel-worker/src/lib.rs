//! StoryReel pipeline orchestration.
//!
//! This crate provides:
//! - Batch orchestration: search, diversity selection, stats, Analyze+Script
//! - Image and audio generation jobs with per-item cancellation
//! - Bounded retry with linear backoff for every generative call
//! - Progress events for presentation-layer subscribers

pub mod board;
pub mod cli;
pub mod config;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod retry;
pub mod selector;

pub use board::ItemBoard;
pub use cli::CliArgs;
pub use config::{WorkerConfig, SELECTION_SIZE};
pub use error::{GenerationError, WorkerError, WorkerResult};
pub use jobs::{GenerationJob, JobHandle, JobRegistry};
pub use logging::JobLogger;
pub use orchestrator::{BatchOrchestrator, BatchSummary};
pub use pipeline::{hydrate, PipelineContext, ScriptOutcome, ScriptResponse};
pub use progress::{EventStream, ProgressChannel};
pub use retry::{retry_generation, RetryPolicy};
pub use selector::{validate_selection, DiversitySelector};
