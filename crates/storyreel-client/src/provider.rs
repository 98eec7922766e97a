//! Provider seams consumed by the orchestration core.

use async_trait::async_trait;
use storyreel_models::{Candidate, ItemId};

use crate::error::ClientResult;
use crate::types::{GeneratedPayload, GenerationRequest, SearchQuery, StatsRecord};

/// A generative provider for text, image and speech.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Run one generative call.
    async fn submit(&self, request: &GenerationRequest) -> ClientResult<GeneratedPayload>;
}

/// An external video search provider.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Search for candidates, in provider order.
    async fn search(&self, query: &SearchQuery) -> ClientResult<Vec<Candidate>>;

    /// Batched engagement lookup. Unknown ids are simply absent from the result.
    async fn lookup_stats(&self, ids: &[ItemId]) -> ClientResult<Vec<StatsRecord>>;
}
