//! In-memory providers for driving the orchestrator in tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures_util::{FutureExt, StreamExt};
use storyreel_client::{
    CandidateSource, ClientError, ClientResult, GeneratedPayload, GenerationRequest, Generator,
    Modality, SearchQuery, StatsRecord,
};
use storyreel_models::{Candidate, ItemId, PipelineEvent};
use storyreel_worker::{BatchOrchestrator, EventStream, WorkerConfig};
use tokio_util::sync::CancellationToken;

pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];

pub const SCRIPT_REPLY: &str = r#"Here you go:
{"analysis": "It matters.", "script": "First fact [1]. Second fact [2].", "imagePrompts": ["a harbor", "a market"]}"#;

type TextFn = dyn Fn(&str) -> ClientResult<String> + Send + Sync;
type CallFn = dyn Fn(usize) -> ClientResult<GeneratedPayload> + Send + Sync;

/// Scripted generator with per-modality call counters.
pub struct FakeGenerator {
    text: Box<TextFn>,
    image: Box<CallFn>,
    audio: Box<CallFn>,
    pub text_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
    pub audio_calls: AtomicUsize,
    /// Cancel the token while the n-th image dispatch (1-based) is in flight
    cancel_on_image: Mutex<Option<(usize, CancellationToken)>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self {
            text: Box::new(|prompt: &str| {
                if prompt.contains("selectedIndices") {
                    Ok(r#"{"selectedIndices": [0, 1, 2, 3]}"#.to_string())
                } else {
                    Ok(SCRIPT_REPLY.to_string())
                }
            }),
            image: Box::new(|_| {
                Ok(GeneratedPayload::Image {
                    bytes: PNG.to_vec(),
                    mime_type: "image/png".to_string(),
                })
            }),
            audio: Box::new(|_| Ok(GeneratedPayload::Audio(vec![0u8; 960]))),
            text_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
            audio_calls: AtomicUsize::new(0),
            cancel_on_image: Mutex::new(None),
        }
    }

    pub fn with_text(
        mut self,
        text: impl Fn(&str) -> ClientResult<String> + Send + Sync + 'static,
    ) -> Self {
        self.text = Box::new(text);
        self
    }

    /// Image replies by 0-based call number.
    pub fn with_images(
        mut self,
        image: impl Fn(usize) -> ClientResult<GeneratedPayload> + Send + Sync + 'static,
    ) -> Self {
        self.image = Box::new(image);
        self
    }

    pub fn with_audio(
        mut self,
        audio: impl Fn(usize) -> ClientResult<GeneratedPayload> + Send + Sync + 'static,
    ) -> Self {
        self.audio = Box::new(audio);
        self
    }

    pub fn cancel_on_image_dispatch(&self, dispatch: usize, token: CancellationToken) {
        *self.cancel_on_image.lock().unwrap() = Some((dispatch, token));
    }

    pub fn images(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    pub fn texts(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn audios(&self) -> usize {
        self.audio_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn submit(&self, request: &GenerationRequest) -> ClientResult<GeneratedPayload> {
        match request.modality {
            Modality::Text => {
                self.text_calls.fetch_add(1, Ordering::SeqCst);
                (self.text)(&request.prompt).map(GeneratedPayload::Text)
            }
            Modality::Image { .. } => {
                let call = self.image_calls.fetch_add(1, Ordering::SeqCst);
                if let Some((dispatch, token)) = self.cancel_on_image.lock().unwrap().as_ref() {
                    if call + 1 == *dispatch {
                        token.cancel();
                    }
                }
                (self.image)(call)
            }
            Modality::Audio { .. } => {
                let call = self.audio_calls.fetch_add(1, Ordering::SeqCst);
                (self.audio)(call)
            }
        }
    }
}

pub enum StatsReply {
    Records(Vec<StatsRecord>),
    Fail,
}

/// Candidate source returning a fixed list.
pub struct FakeSource {
    candidates: Vec<Candidate>,
    stats: StatsReply,
    search_fails: bool,
    pub lookup_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            stats: StatsReply::Records(Vec::new()),
            search_fails: false,
            lookup_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_stats(mut self, stats: StatsReply) -> Self {
        self.stats = stats;
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.search_fails = true;
        self
    }
}

#[async_trait]
impl CandidateSource for FakeSource {
    async fn search(&self, _query: &SearchQuery) -> ClientResult<Vec<Candidate>> {
        if self.search_fails {
            return Err(ClientError::request_failed("quotaExceeded"));
        }
        Ok(self.candidates.clone())
    }

    async fn lookup_stats(&self, ids: &[ItemId]) -> ClientResult<Vec<StatsRecord>> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        match &self.stats {
            StatsReply::Records(records) => Ok(records
                .iter()
                .filter(|r| ids.contains(&r.id))
                .cloned()
                .collect()),
            StatsReply::Fail => Err(ClientError::request_failed("stats unavailable")),
        }
    }
}

/// `count` candidates `vid0..`, most recent first.
pub fn candidates(count: usize) -> Vec<Candidate> {
    let base = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            Candidate::new(
                format!("vid{}", i),
                format!("Story {}", i),
                format!("Snippet {}", i),
                base - chrono::Duration::hours(i as i64),
            )
        })
        .collect()
}

pub fn config(scene_count: usize) -> WorkerConfig {
    WorkerConfig {
        scene_count,
        generation_max_attempts: 1,
        generation_base_delay: Duration::from_millis(5),
        ..WorkerConfig::default()
    }
}

pub fn orchestrator(
    generator: Arc<FakeGenerator>,
    source: FakeSource,
    scene_count: usize,
) -> Arc<BatchOrchestrator> {
    Arc::new(BatchOrchestrator::new(
        generator,
        Arc::new(source),
        config(scene_count),
    ))
}

/// Every event already buffered on the stream.
pub fn drain(events: &mut EventStream) -> Vec<PipelineEvent> {
    let mut out = Vec::new();
    while let Some(Some(event)) = events.next().now_or_never() {
        out.push(event);
    }
    out
}

pub fn type_names(events: &[PipelineEvent]) -> Vec<&'static str> {
    events.iter().map(PipelineEvent::type_name).collect()
}
