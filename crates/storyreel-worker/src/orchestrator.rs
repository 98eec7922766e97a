//! Batch orchestration: search, select, stats, Analyze+Script, and the
//! user-triggered image and audio jobs that follow.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use storyreel_client::{CandidateSource, Generator};
use storyreel_models::{
    item_prefix, sort_by_recency, Candidate, ContentItem, ImageStyle, ItemId, ItemStage, JobKind,
    JobStatus, PipelineEvent,
};
use storyreel_storage::ArtifactStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

use crate::board::ItemBoard;
use crate::config::{WorkerConfig, SELECTION_SIZE};
use crate::error::{WorkerError, WorkerResult};
use crate::jobs::{GenerationJob, JobHandle, JobRegistry};
use crate::logging::JobLogger;
use crate::metrics;
use crate::pipeline::{self, PipelineContext};
use crate::progress::{EventStream, ProgressChannel};
use crate::selector::DiversitySelector;

/// Result of a completed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub search_term: String,
    /// Selected items, in selection order
    pub items: Vec<ItemId>,
    /// Items whose stats lookup returned a record
    pub stats_resolved: usize,
    /// Items whose Analyze+Script answer parsed
    pub scripted: usize,
}

/// Runs batches for one session and owns the shared item board.
pub struct BatchOrchestrator {
    ctx: PipelineContext,
    source: Arc<dyn CandidateSource>,
    selector: DiversitySelector,
    registry: JobRegistry,
    seen: Mutex<HashSet<ItemId>>,
    shutdown: CancellationToken,
}

impl BatchOrchestrator {
    pub fn new(
        generator: Arc<dyn Generator>,
        source: Arc<dyn CandidateSource>,
        config: WorkerConfig,
    ) -> Self {
        let progress = ProgressChannel::new(config.progress_channel_capacity);
        let ctx = PipelineContext::new(
            generator.clone(),
            ArtifactStore::new(),
            ItemBoard::new(),
            progress,
            config,
        );
        let selector = DiversitySelector::new(generator, ctx.policy.clone(), SELECTION_SIZE);
        Self {
            ctx,
            source,
            selector,
            registry: JobRegistry::new(),
            seen: Mutex::new(HashSet::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn board(&self) -> &ItemBoard {
        &self.ctx.board
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.ctx.store
    }

    pub fn progress(&self) -> &ProgressChannel {
        &self.ctx.progress
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.ctx.config
    }

    /// Subscribe to pipeline events.
    pub fn subscribe(&self) -> EventStream {
        self.ctx.progress.subscribe()
    }

    /// Cancel every running batch step and job.
    pub fn shutdown(&self) {
        info!("Shutting down orchestrator");
        self.shutdown.cancel();
    }

    /// Spawn [`Self::run`] and return the events it publishes.
    pub fn run_stream(self: &Arc<Self>, search_term: impl Into<String>) -> EventStream {
        let stream = self.subscribe();
        let this = Arc::clone(self);
        let search_term = search_term.into();
        tokio::spawn(async move {
            if let Err(e) = this.run(&search_term).await {
                warn!("Batch ended with error: {}", e);
            }
        });
        stream
    }

    /// Run one search batch through Analyze+Script.
    ///
    /// Only an empty term, a failed search, or too few unseen candidates end
    /// the batch early. A batch that ends with an error publishes one `Error`
    /// event.
    pub async fn run(&self, search_term: &str) -> WorkerResult<BatchSummary> {
        match self.run_batch(search_term).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                self.report_failure(&e);
                Err(e)
            }
        }
    }

    async fn run_batch(&self, search_term: &str) -> WorkerResult<BatchSummary> {
        let term = search_term.trim();
        if term.is_empty() {
            return Err(WorkerError::EmptySearchTerm);
        }

        let progress = &self.ctx.progress;
        progress.publish(PipelineEvent::BatchStarted {
            search_term: term.to_string(),
        });
        progress.log(format!("Searching videos for \"{}\"...", term));

        let query = self.ctx.config.search_query(term);
        let candidates = match self.source.search(&query).await {
            Ok(candidates) => candidates,
            Err(e) => return Err(WorkerError::search_failed(e.to_string())),
        };

        let mut fresh = self.fresh_candidates(candidates);
        if fresh.len() < SELECTION_SIZE {
            return Err(WorkerError::InsufficientCandidates {
                found: fresh.len(),
                required: SELECTION_SIZE,
            });
        }
        sort_by_recency(&mut fresh);
        progress.log(format!("Found {} new videos, selecting {}...", fresh.len(), SELECTION_SIZE));

        let token = self.shutdown.child_token();
        let selected: Vec<Candidate> = self
            .selector
            .select(term, &fresh, &token)
            .await
            .into_iter()
            .map(|index| fresh[index].clone())
            .collect();

        let item_ids: Vec<ItemId> = selected.iter().map(|c| c.id.clone()).collect();
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(item_ids.iter().cloned());

        let items: Vec<ContentItem> = selected
            .iter()
            .map(|c| ContentItem::from_candidate(c, self.ctx.config.scene_count))
            .collect();
        self.registry.clear();
        let superseded = self.ctx.board.replace_all(items.clone()).await;
        progress.items_selected(items);
        self.drop_artifacts(&superseded).await;

        let stats_resolved = self.resolve_stats(&item_ids).await?;

        let total = item_ids.len();
        let mut scripted = 0;
        for (i, item_id) in item_ids.iter().enumerate() {
            progress.log(format!("Analyzing video {}/{}...", i + 1, total));
            match pipeline::analyze_and_script(&self.ctx, item_id, term, &token).await {
                Ok((_, true)) => scripted += 1,
                Ok((_, false)) => {}
                Err(e) => warn!(item_id = %item_id, "Analyze+Script skipped: {}", e),
            }
            progress.progress(i + 1, total);
        }

        progress.done(total, total);
        metrics::record_batch("completed");
        info!(search_term = term, scripted, total, "Batch completed");

        Ok(BatchSummary {
            search_term: term.to_string(),
            items: item_ids,
            stats_resolved,
            scripted,
        })
    }

    /// Drop previously selected and repeated ids, keeping provider order.
    fn fresh_candidates(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        let mut batch_ids = HashSet::new();
        candidates
            .into_iter()
            .filter(|c| c.id.is_valid() && !seen.contains(&c.id))
            .filter(|c| batch_ids.insert(c.id.clone()))
            .collect()
    }

    /// One batched stats lookup. A failed or partial lookup keeps placeholders.
    async fn resolve_stats(&self, item_ids: &[ItemId]) -> WorkerResult<usize> {
        let records = match self.source.lookup_stats(item_ids).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Stats lookup failed, keeping placeholders: {}", e);
                Vec::new()
            }
        };

        let mut resolved = 0;
        for item_id in item_ids {
            let record = records.iter().find(|r| &r.id == item_id);
            let stats = self
                .ctx
                .board
                .update(item_id, |item| {
                    if let Some(record) = record {
                        item.stats.merge_resolved(&record.stats);
                        if let Some(description) =
                            record.description.as_ref().filter(|d| !d.trim().is_empty())
                        {
                            item.description = description.clone();
                        }
                    }
                    item.advance_to(ItemStage::StatsResolved);
                    item.stats
                })
                .await?;
            if record.is_some() {
                resolved += 1;
            }
            self.ctx.progress.stats_resolved(item_id.clone(), stats);
        }
        Ok(resolved)
    }

    /// Delete the stored media of items no longer on the board.
    async fn drop_artifacts(&self, superseded: &[ContentItem]) {
        for item in superseded {
            let removed = self
                .ctx
                .store
                .delete_prefix(&item_prefix(item.id.as_str()))
                .await;
            if removed > 0 {
                debug!(item_id = %item.id, removed, "Dropped artifacts of superseded item");
            }
        }
    }

    fn report_failure(&self, error: &WorkerError) {
        let message = match error {
            WorkerError::EmptySearchTerm => "Please enter a search term.".to_string(),
            WorkerError::InsufficientCandidates { found, required } => format!(
                "Not enough new videos: found {}, need {}. Try a different search term.",
                found, required
            ),
            WorkerError::SearchFailed(_) => "Video search failed. Please try again.".to_string(),
            _ => "Batch stopped unexpectedly. Please try again.".to_string(),
        };
        if error.is_batch_fatal() {
            warn!("Batch rejected: {}", error);
            metrics::record_batch("rejected");
        } else {
            error!("Batch failed: {}", error);
            metrics::record_batch("failed");
        }
        self.ctx.progress.error(message, error.to_string());
    }

    /// Generate every scene image of an item.
    pub async fn generate_all_images(
        &self,
        item_id: &ItemId,
        style: ImageStyle,
    ) -> WorkerResult<JobHandle> {
        pipeline::image_prompts(&self.ctx.board, item_id, None).await?;
        Ok(self.spawn_job(item_id, JobKind::GenerateAllImages, move |ctx, job| async move {
            pipeline::generate_images(&ctx, &job, style).await
        }))
    }

    /// Regenerate one scene image.
    pub async fn regenerate_image(
        &self,
        item_id: &ItemId,
        scene_index: usize,
        style: ImageStyle,
    ) -> WorkerResult<JobHandle> {
        pipeline::image_prompts(&self.ctx.board, item_id, Some(scene_index)).await?;
        Ok(self.spawn_job(
            item_id,
            JobKind::RegenerateImage(scene_index),
            move |ctx, job| async move {
                pipeline::regenerate_image(&ctx, &job, scene_index, style).await
            },
        ))
    }

    /// Synthesize narration audio. Refused unless the script is ready.
    pub async fn generate_audio(&self, item_id: &ItemId) -> WorkerResult<JobHandle> {
        pipeline::ready_script(&self.ctx.board, item_id).await?;
        Ok(self.spawn_job(item_id, JobKind::GenerateAudio, |ctx, job| async move {
            pipeline::generate_audio(&ctx, &job).await
        }))
    }

    /// Cancel the current job of `kind` for an item.
    pub fn cancel(&self, item_id: &ItemId, kind: JobKind) -> bool {
        let cancelled = self.registry.cancel(item_id, kind);
        if cancelled {
            info!(item_id = %item_id, kind = %kind, "Job cancellation requested");
        }
        cancelled
    }

    pub fn current_job(&self, item_id: &ItemId, kind: JobKind) -> Option<Arc<GenerationJob>> {
        self.registry.current(item_id, kind)
    }

    fn spawn_job<F, Fut>(&self, item_id: &ItemId, kind: JobKind, work: F) -> JobHandle
    where
        F: FnOnce(PipelineContext, Arc<GenerationJob>) -> Fut,
        Fut: Future<Output = WorkerResult<JobStatus>> + Send + 'static,
    {
        let job = Arc::new(GenerationJob::new(
            item_id.clone(),
            kind,
            self.shutdown.child_token(),
            self.ctx.progress.clone(),
        ));
        let handle = JobHandle::new(job.clone());
        if let Some(previous) = self.registry.register(job.clone()) {
            info!(item_id = %item_id, kind = %kind, superseded = %previous.id(), "Job superseded");
        }

        let logger = JobLogger::new(job.id(), item_id, kind);
        let span = logger.create_span();
        let work = work(self.ctx.clone(), job.clone());
        tokio::spawn(
            async move {
                let status = match work.await {
                    Ok(status) => status,
                    Err(e) => {
                        logger.log_error(&e.to_string());
                        JobStatus::Failed
                    }
                };
                job.set_status(status);
            }
            .instrument(span),
        );
        handle
    }
}
