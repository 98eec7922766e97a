//! Diversity selection over recency-sorted candidates.

use std::sync::Arc;

use serde::Deserialize;
use storyreel_client::{lenient, parse_structured, GenerationRequest, Generator};
use storyreel_models::Candidate;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::prompts::selection_prompt;
use crate::retry::{retry_generation, RetryPolicy};

/// Ranking response; every field optional at the parse boundary.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub selected_indices: Option<Vec<serde_json::Value>>,
}

impl SelectionResponse {
    /// Indices that are integers or integer strings; anything else is skipped.
    pub fn raw_indices(&self) -> Vec<i64> {
        self.selected_indices
            .iter()
            .flatten()
            .filter_map(|value| match value {
                serde_json::Value::Number(n) => n.as_i64(),
                serde_json::Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .collect()
    }
}

/// Turn a raw index list into exactly `count` distinct indices below `len`.
///
/// Out-of-range and repeated indices are dropped (first occurrence wins), the
/// list is capped at `count`, and the lowest unused indices fill the rest.
/// When `len < count` every index is returned.
pub fn validate_selection(raw: &[i64], len: usize, count: usize) -> Vec<usize> {
    let target = count.min(len);
    let mut selected: Vec<usize> = Vec::with_capacity(target);

    for &index in raw {
        if selected.len() == target {
            break;
        }
        let Ok(index) = usize::try_from(index) else {
            continue;
        };
        if index < len && !selected.contains(&index) {
            selected.push(index);
        }
    }

    let mut next = 0;
    while selected.len() < target {
        if !selected.contains(&next) {
            selected.push(next);
        }
        next += 1;
    }

    selected
}

/// Picks a topically diverse subset with one ranking call.
pub struct DiversitySelector {
    generator: Arc<dyn Generator>,
    policy: RetryPolicy,
    count: usize,
}

impl DiversitySelector {
    pub fn new(generator: Arc<dyn Generator>, policy: RetryPolicy, count: usize) -> Self {
        Self {
            generator,
            policy,
            count,
        }
    }

    /// Select indices into `candidates`.
    ///
    /// Never fails: a failed call or an unusable answer falls back to the most
    /// recent candidates.
    pub async fn select(
        &self,
        search_term: &str,
        candidates: &[Candidate],
        token: &CancellationToken,
    ) -> Vec<usize> {
        let request = GenerationRequest::text(selection_prompt(search_term, candidates, self.count));
        let generator = self.generator.clone();

        let raw = retry_generation(&self.policy, token, "select", || {
            let generator = generator.clone();
            let request = request.clone();
            async move { generator.submit(&request).await?.into_text() }
        })
        .await;

        let indices = match raw {
            Ok(text) => match parse_structured::<SelectionResponse>(&text) {
                Ok(response) => response.raw_indices(),
                Err(e) => {
                    warn!("Selection response unusable, using most recent: {}", e);
                    Vec::new()
                }
            },
            Err(e) => {
                warn!("Selection call failed, using most recent: {}", e);
                Vec::new()
            }
        };

        let selected = validate_selection(&indices, candidates.len(), self.count);
        info!(?selected, candidates = candidates.len(), "Candidates selected");
        selected
    }
}
