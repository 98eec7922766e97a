//! Per-item content stages: Analyze+Script, scene images, narration audio.
//!
//! Every stage catches its own failures. Text stages record failure
//! sentinels on the item; image and audio stages restore the state they
//! replaced and report through the progress channel.

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use storyreel_client::{lenient, parse_structured, GenerationRequest, Generator};
use storyreel_media::{extension_for_mime, resolve_image_mime, wrap_pcm, WavFormat, WAV_MIME};
use storyreel_models::{
    narration_key, scene_image_key, sentinel, AspectRatio, AudioState, ContentItem,
    GeneratedText, ImageStyle, ItemId, ItemStage, JobId, JobStatus, MediaRef, ScenePrompts,
    SceneSlot,
};
use storyreel_storage::ArtifactStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::board::ItemBoard;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::jobs::GenerationJob;
use crate::logging::JobLogger;
use crate::metrics;
use crate::progress::ProgressChannel;
use crate::prompts::{script_prompt, ScriptPromptInput};
use crate::retry::{retry_generation, RetryPolicy};

/// Shared dependencies for every stage.
#[derive(Clone)]
pub struct PipelineContext {
    pub generator: Arc<dyn Generator>,
    pub store: ArtifactStore,
    pub board: ItemBoard,
    pub progress: ProgressChannel,
    pub config: WorkerConfig,
    pub policy: RetryPolicy,
}

impl PipelineContext {
    pub fn new(
        generator: Arc<dyn Generator>,
        store: ArtifactStore,
        board: ItemBoard,
        progress: ProgressChannel,
        config: WorkerConfig,
    ) -> Self {
        let policy = config.retry_policy();
        Self {
            generator,
            store,
            board,
            progress,
            config,
            policy,
        }
    }

    /// Run one text call through the retry combinator.
    async fn generate_text(
        &self,
        prompt: String,
        operation: &str,
        token: &CancellationToken,
    ) -> WorkerResult<String> {
        let request = GenerationRequest::text(prompt);
        let started = Instant::now();
        let text = retry_generation(&self.policy, token, operation, || {
            let generator = self.generator.clone();
            let request = request.clone();
            async move { generator.submit(&request).await?.into_text() }
        })
        .await;
        metrics::record_generation_duration(operation, started.elapsed().as_secs_f64());
        Ok(text?)
    }
}

/// Analyze+Script response; every field optional at the parse boundary.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub analysis: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub script: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub image_prompts: Option<Vec<serde_json::Value>>,
}

/// Hydrated Analyze+Script result.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptOutcome {
    pub analysis: GeneratedText,
    pub script: GeneratedText,
    pub prompts: ScenePrompts,
}

impl ScriptOutcome {
    /// Outcome recorded when the call failed or its answer was unusable.
    pub fn failed(scene_count: usize) -> Self {
        Self {
            analysis: GeneratedText::Failed(sentinel::ANALYSIS_FAILED.to_string()),
            script: GeneratedText::Failed(sentinel::SCRIPT_FAILED.to_string()),
            prompts: ScenePrompts::uniform(scene_count, sentinel::FAILED_SCENE_PROMPT),
        }
    }

    fn apply(self, item: &mut ContentItem) {
        item.analysis = self.analysis;
        item.advance_to(ItemStage::Analyzed);
        item.script = self.script;
        item.set_scene_prompts(self.prompts);
        item.advance_to(ItemStage::Scripted);
    }
}

/// Apply defaults to a parsed response.
pub fn hydrate(response: ScriptResponse, scene_count: usize) -> ScriptOutcome {
    let analysis = GeneratedText::classify(
        response.analysis.as_deref(),
        sentinel::NO_CONTENT_ANALYSIS,
        sentinel::ANALYSIS_UNAVAILABLE,
    );
    let script = GeneratedText::classify(
        response.script.as_deref(),
        sentinel::NO_CONTENT_SCRIPT,
        sentinel::SCRIPT_BAD_FORMAT,
    );
    let raw_prompts = response
        .image_prompts
        .unwrap_or_default()
        .into_iter()
        .map(|value| match value {
            serde_json::Value::String(s) => s,
            _ => String::new(),
        })
        .collect();

    ScriptOutcome {
        analysis,
        script,
        prompts: ScenePrompts::normalize(raw_prompts, scene_count, sentinel::PLACEHOLDER_SCENE_PROMPT),
    }
}

/// Run Analyze+Script for one item and record the outcome on the board.
///
/// Returns the updated item and whether the answer parsed. Only a missing
/// item is an error.
pub async fn analyze_and_script(
    ctx: &PipelineContext,
    item_id: &ItemId,
    search_term: &str,
    token: &CancellationToken,
) -> WorkerResult<(ContentItem, bool)> {
    let item = ctx
        .board
        .get(item_id)
        .await
        .ok_or_else(|| WorkerError::ItemNotFound(item_id.clone()))?;
    let scene_count = item.scene_count();

    let prompt = script_prompt(&ScriptPromptInput {
        search_term,
        title: &item.title,
        description: &item.description,
        stats: &item.stats,
        scene_count,
        description_limit: ctx.config.description_prompt_limit,
        language: &ctx.config.narration_language,
    });

    let outcome = match ctx.generate_text(prompt, "analyze_script", token).await {
        Ok(text) => match parse_structured::<ScriptResponse>(&text) {
            Ok(response) => Some(hydrate(response, scene_count)),
            Err(e) => {
                warn!(item_id = %item_id, "Script response unusable: {}", e);
                None
            }
        },
        Err(e) => {
            warn!(item_id = %item_id, "Script generation failed: {}", e);
            None
        }
    };

    let parsed = outcome.is_some();
    let outcome = outcome.unwrap_or_else(|| ScriptOutcome::failed(scene_count));
    let updated = ctx
        .board
        .update(item_id, |item| {
            outcome.apply(item);
            item.clone()
        })
        .await?;

    metrics::record_item_processed(if parsed { "parsed" } else { "failed" });
    info!(item_id = %item_id, parsed, "Analyze+Script finished");
    ctx.progress.item_updated(updated.clone());
    Ok((updated, parsed))
}

/// Scene prompts of an item, checking `scene` when one is given.
pub async fn image_prompts(
    board: &ItemBoard,
    item_id: &ItemId,
    scene: Option<usize>,
) -> WorkerResult<ScenePrompts> {
    let item = board
        .get(item_id)
        .await
        .ok_or_else(|| WorkerError::ItemNotFound(item_id.clone()))?;

    if let Some(index) = scene {
        if index >= item.scene_count() {
            return Err(WorkerError::InvalidSceneIndex {
                index,
                scene_count: item.scene_count(),
            });
        }
    }

    item.scene_prompts()
        .cloned()
        .ok_or_else(|| WorkerError::ScenePromptsMissing(item_id.clone()))
}

/// Generate and store one scene image under a key owned by `job_id`.
async fn render_scene(
    ctx: &PipelineContext,
    job_id: &JobId,
    item_id: &ItemId,
    index: usize,
    prompt: &str,
    style: ImageStyle,
    token: &CancellationToken,
) -> WorkerResult<MediaRef> {
    let request = GenerationRequest::image(style.apply(prompt), AspectRatio::LANDSCAPE);
    let started = Instant::now();
    let result = retry_generation(&ctx.policy, token, "image", || {
        let generator = ctx.generator.clone();
        let request = request.clone();
        async move { generator.submit(&request).await?.into_image() }
    })
    .await;
    metrics::record_generation_duration("image", started.elapsed().as_secs_f64());

    let (bytes, declared) = result?;
    let mime_type = resolve_image_mime(Some(&declared), &bytes);
    let key = scene_image_key(
        item_id.as_str(),
        index,
        job_id.as_str(),
        extension_for_mime(&mime_type),
    );
    Ok(ctx.store.put_bytes(&key, bytes, &mime_type).await?)
}

/// Write a slot and publish the write.
async fn write_slot(
    ctx: &PipelineContext,
    item_id: &ItemId,
    index: usize,
    slot: SceneSlot,
) -> WorkerResult<SceneSlot> {
    let prior = ctx.board.set_image_slot(item_id, index, slot.clone()).await?;
    ctx.progress.slot(item_id.clone(), index, slot);
    Ok(prior)
}

/// Point a claimed slot at freshly stored bytes.
///
/// Bytes the slot or the job's prior state referenced are deleted. If the
/// item is gone the new bytes are deleted instead.
async fn resolve_slot(
    ctx: &PipelineContext,
    item_id: &ItemId,
    index: usize,
    media: MediaRef,
    prior: &SceneSlot,
) -> WorkerResult<()> {
    let key = media.key.clone();
    match write_slot(ctx, item_id, index, SceneSlot::Ready(media)).await {
        Ok(replaced) => {
            discard(ctx, replaced.media()).await;
            discard(ctx, prior.media()).await;
            Ok(())
        }
        Err(e) => {
            ctx.store.delete(&key).await;
            Err(e)
        }
    }
}

/// Hand a slot back after a failed or cancelled render.
///
/// Only the claiming job may restore. When another job has taken the slot
/// the prior bytes are no longer referenced and are deleted.
async fn restore_slot(
    ctx: &PipelineContext,
    owner: &JobId,
    item_id: &ItemId,
    index: usize,
    prior: SceneSlot,
) -> WorkerResult<()> {
    let prior_media = prior.media().cloned();
    match ctx
        .board
        .restore_image_slot(item_id, index, owner, prior)
        .await?
    {
        Some(slot) => ctx.progress.slot(item_id.clone(), index, slot),
        None => discard(ctx, prior_media.as_ref()).await,
    }
    Ok(())
}

/// Delete stored bytes nothing points at any more.
async fn discard(ctx: &PipelineContext, media: Option<&MediaRef>) {
    if let Some(media) = media {
        if ctx.store.delete(&media.key).await {
            debug!(key = %media.key, "Discarded superseded artifact");
        }
    }
}

/// Generate every scene image of an item in order.
///
/// A failed scene is logged, its slot restored, and the loop moves on.
/// Cancellation stops the loop before the next dispatch; slots already
/// written stay.
pub async fn generate_images(
    ctx: &PipelineContext,
    job: &GenerationJob,
    style: ImageStyle,
) -> WorkerResult<JobStatus> {
    let item_id = job.item_id();
    let logger = JobLogger::new(job.id(), item_id, job.kind());
    let prompts = image_prompts(&ctx.board, item_id, None).await?;

    job.set_status(JobStatus::Running);
    logger.log_start(&format!("{} scenes, style {}", prompts.len(), style));

    let mut generated = 0usize;
    let mut failed = 0usize;
    let mut cancelled = false;

    for (index, prompt) in prompts.as_slice().iter().enumerate() {
        if job.is_cancelled() {
            cancelled = true;
            break;
        }

        let prior = write_slot(ctx, item_id, index, SceneSlot::in_progress(job.id())).await?;

        match render_scene(ctx, job.id(), item_id, index, prompt, style, job.token()).await {
            Ok(media) => {
                resolve_slot(ctx, item_id, index, media, &prior).await?;
                generated += 1;
                logger.log_progress(&format!("scene {} ready", index + 1));
            }
            Err(e) if e.is_cancelled() => {
                restore_slot(ctx, job.id(), item_id, index, prior).await?;
                cancelled = true;
                break;
            }
            Err(e) => {
                logger.log_warning(&format!("scene {} failed: {}", index + 1, e));
                restore_slot(ctx, job.id(), item_id, index, prior).await?;
                failed += 1;
            }
        }
    }

    let status = if cancelled {
        JobStatus::Cancelled
    } else if generated == 0 && failed > 0 {
        JobStatus::Failed
    } else {
        JobStatus::Done
    };
    logger.log_completion(&format!(
        "{}: {} generated, {} failed",
        status, generated, failed
    ));
    Ok(status)
}

/// Regenerate a single scene image.
///
/// Failure leaves the slot empty and sends a notification. Cancellation
/// restores whatever the slot held before.
pub async fn regenerate_image(
    ctx: &PipelineContext,
    job: &GenerationJob,
    index: usize,
    style: ImageStyle,
) -> WorkerResult<JobStatus> {
    let item_id = job.item_id();
    let logger = JobLogger::new(job.id(), item_id, job.kind());
    let prompts = image_prompts(&ctx.board, item_id, Some(index)).await?;
    let prompt = prompts
        .get(index)
        .ok_or(WorkerError::InvalidSceneIndex {
            index,
            scene_count: prompts.len(),
        })?
        .to_string();

    if job.is_cancelled() {
        return Ok(JobStatus::Cancelled);
    }

    job.set_status(JobStatus::Running);
    logger.log_start(&format!("scene {}, style {}", index + 1, style));
    let prior = write_slot(ctx, item_id, index, SceneSlot::in_progress(job.id())).await?;

    match render_scene(ctx, job.id(), item_id, index, &prompt, style, job.token()).await {
        Ok(media) => {
            resolve_slot(ctx, item_id, index, media, &prior).await?;
            logger.log_completion(&format!("scene {} ready", index + 1));
            Ok(JobStatus::Done)
        }
        Err(e) if e.is_cancelled() => {
            restore_slot(ctx, job.id(), item_id, index, prior).await?;
            logger.log_progress("cancelled");
            Ok(JobStatus::Cancelled)
        }
        Err(e) => {
            logger.log_error(&e.to_string());
            restore_slot(ctx, job.id(), item_id, index, SceneSlot::Empty).await?;
            discard(ctx, prior.media()).await;
            ctx.progress.notify(
                item_id.clone(),
                format!("Image regeneration failed for scene {}. Please try again.", index + 1),
            );
            Ok(JobStatus::Failed)
        }
    }
}

/// Synthesize the narration and store it as WAV.
async fn render_narration(
    ctx: &PipelineContext,
    job_id: &JobId,
    item_id: &ItemId,
    script: &str,
    token: &CancellationToken,
) -> WorkerResult<MediaRef> {
    let request = GenerationRequest::speech(script);
    let started = Instant::now();
    let result = retry_generation(&ctx.policy, token, "speech", || {
        let generator = ctx.generator.clone();
        let request = request.clone();
        async move { generator.submit(&request).await?.into_audio() }
    })
    .await;
    metrics::record_generation_duration("speech", started.elapsed().as_secs_f64());

    let pcm = result?;
    let wav = wrap_pcm(&pcm, WavFormat::default())?;
    debug!(item_id = %item_id, pcm_bytes = pcm.len(), "Narration synthesized");
    Ok(ctx
        .store
        .put_bytes(&narration_key(item_id.as_str(), job_id.as_str()), wav, WAV_MIME)
        .await?)
}

/// Generate narration audio for a scripted item.
///
/// Refused with `ScriptNotReady` unless the script is ready. On failure the
/// previous audio state comes back and a notification is sent.
pub async fn generate_audio(ctx: &PipelineContext, job: &GenerationJob) -> WorkerResult<JobStatus> {
    let item_id = job.item_id();
    let logger = JobLogger::new(job.id(), item_id, job.kind());
    let script = ready_script(&ctx.board, item_id).await?;

    if job.is_cancelled() {
        return Ok(JobStatus::Cancelled);
    }

    job.set_status(JobStatus::Running);
    logger.log_start(&format!("{} script chars", script.chars().count()));
    let claim = AudioState::in_progress(job.id());
    let prior = ctx.board.set_audio(item_id, claim.clone()).await?;
    ctx.progress.audio(item_id.clone(), claim);

    match render_narration(ctx, job.id(), item_id, &script, job.token()).await {
        Ok(media) => {
            let key = media.key.clone();
            let audio = AudioState::Ready(media);
            let replaced = match ctx.board.set_audio(item_id, audio.clone()).await {
                Ok(replaced) => replaced,
                Err(e) => {
                    ctx.store.delete(&key).await;
                    return Err(e);
                }
            };
            discard(ctx, replaced.media()).await;
            discard(ctx, prior.media()).await;
            ctx.progress.audio(item_id.clone(), audio);
            logger.log_completion("narration ready");
            Ok(JobStatus::Done)
        }
        Err(e) => {
            let prior_media = prior.media().cloned();
            match ctx.board.restore_audio(item_id, job.id(), prior).await? {
                Some(restored) => ctx.progress.audio(item_id.clone(), restored),
                None => discard(ctx, prior_media.as_ref()).await,
            }
            if e.is_cancelled() {
                logger.log_progress("cancelled");
                return Ok(JobStatus::Cancelled);
            }
            logger.log_error(&e.to_string());
            ctx.progress
                .notify(item_id.clone(), "Audio generation failed. Please try again.");
            Ok(JobStatus::Failed)
        }
    }
}

/// The item's script, if it is ready for narration.
pub async fn ready_script(board: &ItemBoard, item_id: &ItemId) -> WorkerResult<String> {
    let item = board
        .get(item_id)
        .await
        .ok_or_else(|| WorkerError::ItemNotFound(item_id.clone()))?;
    item.script
        .ready_text()
        .map(str::to_string)
        .ok_or_else(|| WorkerError::ScriptNotReady(item_id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use futures_util::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storyreel_client::{ClientError, ClientResult, GeneratedPayload, Modality};
    use storyreel_models::{Candidate, JobKind, PipelineEvent};

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    type Reply = dyn Fn(&GenerationRequest, usize) -> ClientResult<GeneratedPayload> + Send + Sync;

    /// Generator answering through a closure of (request, call number).
    struct FnGenerator {
        reply: Box<Reply>,
        calls: AtomicUsize,
    }

    impl FnGenerator {
        fn new(
            reply: impl Fn(&GenerationRequest, usize) -> ClientResult<GeneratedPayload>
                + Send
                + Sync
                + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                reply: Box::new(reply),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Generator for FnGenerator {
        async fn submit(&self, request: &GenerationRequest) -> ClientResult<GeneratedPayload> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            (self.reply)(request, call)
        }
    }

    fn image_ok() -> ClientResult<GeneratedPayload> {
        Ok(GeneratedPayload::Image {
            bytes: PNG.to_vec(),
            mime_type: "image/png".to_string(),
        })
    }

    async fn context(generator: Arc<FnGenerator>, scene_count: usize) -> PipelineContext {
        let config = WorkerConfig {
            scene_count,
            generation_max_attempts: 1,
            generation_base_delay: std::time::Duration::from_millis(1),
            ..WorkerConfig::default()
        };
        let ctx = PipelineContext::new(
            generator,
            ArtifactStore::new(),
            ItemBoard::new(),
            ProgressChannel::new(64),
            config,
        );
        let candidate = Candidate::new("vid1", "Title", "A description", Utc::now());
        ctx.board
            .replace_all(vec![ContentItem::from_candidate(&candidate, scene_count)])
            .await;
        ctx
    }

    async fn script_item(ctx: &PipelineContext, script: GeneratedText) {
        let scene_count = ctx.config.scene_count;
        ctx.board
            .update(&ItemId::from("vid1"), |item| {
                ScriptOutcome {
                    analysis: GeneratedText::Ready("why".to_string()),
                    script,
                    prompts: ScenePrompts::uniform(scene_count, "a scene"),
                }
                .apply(item)
            })
            .await
            .unwrap();
    }

    fn job(ctx: &PipelineContext, kind: JobKind) -> GenerationJob {
        GenerationJob::new(
            ItemId::from("vid1"),
            kind,
            CancellationToken::new(),
            ctx.progress.clone(),
        )
    }

    #[test]
    fn test_hydrate_fills_defaults() {
        let response: ScriptResponse = serde_json::from_str(
            r#"{"analysis": "  Matters.  ", "imagePrompts": ["one", 2, "", "four"]}"#,
        )
        .unwrap();
        let outcome = hydrate(response, 5);

        assert_eq!(outcome.analysis, GeneratedText::Ready("Matters.".to_string()));
        assert_eq!(
            outcome.script,
            GeneratedText::Failed(sentinel::SCRIPT_BAD_FORMAT.to_string())
        );
        assert_eq!(
            outcome.prompts.as_slice(),
            &["one", "scenic background", "scenic background", "four", "scenic background"]
        );
    }

    #[test]
    fn test_hydrate_no_content_sentinels() {
        let response: ScriptResponse = serde_json::from_str(&format!(
            r#"{{"analysis": "{}", "script": "{}", "imagePrompts": null}}"#,
            sentinel::NO_CONTENT_ANALYSIS,
            sentinel::NO_CONTENT_SCRIPT
        ))
        .unwrap();
        let outcome = hydrate(response, 3);

        assert_eq!(outcome.analysis, GeneratedText::NoContent);
        assert_eq!(outcome.script, GeneratedText::NoContent);
        assert_eq!(outcome.prompts.len(), 3);
    }

    #[tokio::test]
    async fn test_analyze_and_script_parses_response() {
        let generator = FnGenerator::new(|request, _| {
            assert_eq!(request.modality, Modality::Text);
            assert!(request.prompt.contains("Title: Title"));
            Ok(GeneratedPayload::Text(
                "```json\n{\"analysis\": \"Important.\", \"script\": \"First [1]\nthen [2]\", \"imagePrompts\": [\"a\", \"b\"]}\n```"
                    .to_string(),
            ))
        });
        let ctx = context(generator, 2).await;
        let mut events = ctx.progress.subscribe();

        let (item, parsed) =
            analyze_and_script(&ctx, &ItemId::from("vid1"), "news", &CancellationToken::new())
                .await
                .unwrap();

        assert!(parsed);
        assert_eq!(item.stage, ItemStage::Scripted);
        assert_eq!(item.script.ready_text(), Some("First [1]\nthen [2]"));
        assert_eq!(item.scene_prompts().unwrap().as_slice(), &["a", "b"]);
        assert_eq!(events.next().await.unwrap().type_name(), "item_updated");
    }

    #[tokio::test]
    async fn test_analyze_and_script_failure_sentinels() {
        let generator = FnGenerator::new(|_, _| Ok(GeneratedPayload::Text("I cannot help".to_string())));
        let ctx = context(generator, 3).await;

        let (item, parsed) =
            analyze_and_script(&ctx, &ItemId::from("vid1"), "news", &CancellationToken::new())
                .await
                .unwrap();

        assert!(!parsed);
        assert!(item.is_scripted());
        assert_eq!(item.analysis_display(), sentinel::ANALYSIS_FAILED);
        assert_eq!(item.script_display(), sentinel::SCRIPT_FAILED);
        assert_eq!(
            item.scene_prompts().unwrap(),
            &ScenePrompts::uniform(3, sentinel::FAILED_SCENE_PROMPT)
        );
    }

    #[tokio::test]
    async fn test_generate_images_partial_failure() {
        let generator = FnGenerator::new(|request, call| {
            assert!(request.prompt.starts_with("a scene\n\nStyle:"));
            if call == 1 {
                Err(ClientError::request_failed("503"))
            } else {
                image_ok()
            }
        });
        let ctx = context(generator, 3).await;
        script_item(&ctx, GeneratedText::Ready("s".to_string())).await;
        let job = job(&ctx, JobKind::GenerateAllImages);

        let status = generate_images(&ctx, &job, ImageStyle::Doodle).await.unwrap();

        assert_eq!(status, JobStatus::Done);
        let item = ctx.board.get(&ItemId::from("vid1")).await.unwrap();
        assert_eq!(item.images().len(), 3);
        assert!(item.images()[0].is_ready());
        assert_eq!(item.images()[1], SceneSlot::Empty);
        assert!(item.images()[2].is_ready());
        let job_id = job.id().as_str();
        assert_eq!(
            ctx.store.list("items/vid1/").await,
            vec![
                format!("items/vid1/scene_01_{}.png", job_id),
                format!("items/vid1/scene_03_{}.png", job_id),
            ]
        );
    }

    #[tokio::test]
    async fn test_generate_images_all_failed() {
        let generator = FnGenerator::new(|_, _| Err(ClientError::request_failed("503")));
        let ctx = context(generator, 2).await;
        script_item(&ctx, GeneratedText::Ready("s".to_string())).await;

        let status = generate_images(&ctx, &job(&ctx, JobKind::GenerateAllImages), ImageStyle::Realistic)
            .await
            .unwrap();
        assert_eq!(status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_generate_images_requires_prompts() {
        let ctx = context(FnGenerator::new(|_, _| image_ok()), 2).await;
        let result = generate_images(&ctx, &job(&ctx, JobKind::GenerateAllImages), ImageStyle::Doodle).await;
        assert!(matches!(result, Err(WorkerError::ScenePromptsMissing(_))));
    }

    #[tokio::test]
    async fn test_regenerate_failure_notifies_and_empties_slot() {
        let generator = FnGenerator::new(|_, call| {
            if call == 0 {
                image_ok()
            } else {
                Err(ClientError::request_failed("503"))
            }
        });
        let ctx = context(generator, 2).await;
        script_item(&ctx, GeneratedText::Ready("s".to_string())).await;
        let id = ItemId::from("vid1");

        let first = job(&ctx, JobKind::RegenerateImage(1));
        assert_eq!(
            regenerate_image(&ctx, &first, 1, ImageStyle::Doodle).await.unwrap(),
            JobStatus::Done
        );
        assert!(ctx.board.get(&id).await.unwrap().images()[1].is_ready());

        let mut events = ctx.progress.subscribe();
        let second = job(&ctx, JobKind::RegenerateImage(1));
        assert_eq!(
            regenerate_image(&ctx, &second, 1, ImageStyle::Doodle).await.unwrap(),
            JobStatus::Failed
        );
        assert_eq!(ctx.board.get(&id).await.unwrap().images()[1], SceneSlot::Empty);

        let mut notified = false;
        while let Ok(Some(event)) =
            tokio::time::timeout(std::time::Duration::from_millis(50), events.next()).await
        {
            if let PipelineEvent::Notification { message, .. } = event {
                assert!(message.contains("scene 2"));
                notified = true;
            }
        }
        assert!(notified);
    }

    #[tokio::test]
    async fn test_regenerate_rejects_bad_index() {
        let ctx = context(FnGenerator::new(|_, _| image_ok()), 2).await;
        script_item(&ctx, GeneratedText::Ready("s".to_string())).await;

        let result = regenerate_image(&ctx, &job(&ctx, JobKind::RegenerateImage(2)), 2, ImageStyle::Doodle).await;
        assert!(matches!(
            result,
            Err(WorkerError::InvalidSceneIndex { index: 2, scene_count: 2 })
        ));
    }

    #[tokio::test]
    async fn test_generate_audio_wraps_pcm() {
        let generator = FnGenerator::new(|request, _| {
            assert_eq!(request.modality, Modality::Audio { voice: None });
            Ok(GeneratedPayload::Audio(vec![0u8; 480]))
        });
        let ctx = context(generator, 2).await;
        script_item(&ctx, GeneratedText::Ready("Narration [1].".to_string())).await;

        let status = generate_audio(&ctx, &job(&ctx, JobKind::GenerateAudio)).await.unwrap();

        assert_eq!(status, JobStatus::Done);
        let item = ctx.board.get(&ItemId::from("vid1")).await.unwrap();
        let AudioState::Ready(media) = item.audio else {
            panic!("audio not ready");
        };
        assert_eq!(media.mime_type, WAV_MIME);
        let bytes = ctx.store.fetch(&media).await.unwrap();
        assert_eq!(bytes.len(), 44 + 480);
        assert_eq!(&bytes[0..4], b"RIFF");
    }

    #[tokio::test]
    async fn test_generate_audio_refused_without_script() {
        let generator = FnGenerator::new(|_, _| Ok(GeneratedPayload::Audio(vec![1, 2])));
        let ctx = context(generator.clone(), 2).await;
        script_item(&ctx, GeneratedText::NoContent).await;

        let result = generate_audio(&ctx, &job(&ctx, JobKind::GenerateAudio)).await;

        assert!(matches!(result, Err(WorkerError::ScriptNotReady(_))));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generate_audio_failure_restores_state() {
        let generator = FnGenerator::new(|_, _| Err(ClientError::request_failed("503")));
        let ctx = context(generator, 2).await;
        script_item(&ctx, GeneratedText::Ready("Narration".to_string())).await;

        let status = generate_audio(&ctx, &job(&ctx, JobKind::GenerateAudio)).await.unwrap();

        assert_eq!(status, JobStatus::Failed);
        let item = ctx.board.get(&ItemId::from("vid1")).await.unwrap();
        assert_eq!(item.audio, AudioState::Absent);
        assert!(ctx.store.list("items/vid1/").await.is_empty());
    }

    #[tokio::test]
    async fn test_interleaved_writers_keep_slot_and_bytes_consistent() {
        let generator = FnGenerator::new(|_, call| {
            Ok(GeneratedPayload::Image {
                bytes: vec![0x89; 10 * (call + 1)],
                mime_type: "image/png".to_string(),
            })
        });
        let ctx = context(generator, 4).await;
        let id = ItemId::from("vid1");
        let token = CancellationToken::new();
        let (regen, generate_all) = (JobId::new(), JobId::new());

        let regen_prior = write_slot(&ctx, &id, 3, SceneSlot::in_progress(&regen)).await.unwrap();
        let regen_media = render_scene(&ctx, &regen, &id, 3, "a", ImageStyle::Doodle, &token)
            .await
            .unwrap();
        let all_prior = write_slot(&ctx, &id, 3, SceneSlot::in_progress(&generate_all))
            .await
            .unwrap();
        let all_media = render_scene(&ctx, &generate_all, &id, 3, "a", ImageStyle::Doodle, &token)
            .await
            .unwrap();
        assert_ne!(regen_media.key, all_media.key);

        resolve_slot(&ctx, &id, 3, all_media.clone(), &all_prior).await.unwrap();
        resolve_slot(&ctx, &id, 3, regen_media.clone(), &regen_prior).await.unwrap();

        let item = ctx.board.get(&id).await.unwrap();
        let media = item.images()[3].media().unwrap();
        assert_eq!(media, &regen_media);
        let bytes = ctx.store.fetch(media).await.unwrap();
        assert_eq!(media.byte_len, bytes.len() as u64);
        assert_eq!(bytes.len(), 10);
        assert!(!ctx.store.exists(&all_media.key).await);
    }

    #[tokio::test]
    async fn test_failed_restore_leaves_other_claim() {
        let ctx = context(FnGenerator::new(|_, _| image_ok()), 2).await;
        let id = ItemId::from("vid1");
        let original = ctx
            .store
            .put_bytes("items/vid1/scene_02_first.png", PNG.to_vec(), "image/png")
            .await
            .unwrap();
        write_slot(&ctx, &id, 1, SceneSlot::Ready(original.clone())).await.unwrap();
        let (regen, generate_all) = (JobId::new(), JobId::new());

        let regen_prior = write_slot(&ctx, &id, 1, SceneSlot::in_progress(&regen)).await.unwrap();
        write_slot(&ctx, &id, 1, SceneSlot::in_progress(&generate_all)).await.unwrap();
        restore_slot(&ctx, &regen, &id, 1, regen_prior).await.unwrap();

        let item = ctx.board.get(&id).await.unwrap();
        assert!(item.images()[1].is_claimed_by(&generate_all));
        assert!(!ctx.store.exists(&original.key).await);
    }
}
