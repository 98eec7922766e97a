//! Structured logging utilities.
//!
//! Provides subscriber setup for the binary and consistent, structured
//! logging for generation jobs.

use storyreel_models::{ItemId, JobId, JobKind};
use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("storyreel=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }
}

/// Structured log lines for one generation job.
///
/// Every line carries the job ID, the item it works on and the job kind.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    item_id: String,
    kind: String,
}

impl JobLogger {
    /// Logger for `kind` running on `item_id`.
    pub fn new(job_id: &JobId, item_id: &ItemId, kind: JobKind) -> Self {
        Self {
            job_id: job_id.to_string(),
            item_id: item_id.to_string(),
            kind: kind.to_string(),
        }
    }

    /// Log the start of a job.
    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            item_id = %self.item_id,
            kind = %self.kind,
            "Generation job started: {}", message
        );
    }

    /// Log a progress update.
    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            item_id = %self.item_id,
            kind = %self.kind,
            "Generation job: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            item_id = %self.item_id,
            kind = %self.kind,
            "Generation job hit a problem: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            item_id = %self.item_id,
            kind = %self.kind,
            "Generation job failed: {}", message
        );
    }

    /// Log the completion of a job.
    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            item_id = %self.item_id,
            kind = %self.kind,
            "Generation job finished: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Span wrapping the job task.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "generation_job",
            job_id = %self.job_id,
            item_id = %self.item_id,
            kind = %self.kind
        )
    }
}
