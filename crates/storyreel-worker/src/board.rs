//! The item board: shared, keyed-write collection of content items.

use std::sync::Arc;

use storyreel_models::{AudioState, ContentItem, ItemId, JobId, SceneSlot};
use tokio::sync::RwLock;

use crate::error::{WorkerError, WorkerResult};

/// Items of the current session, in selection order.
///
/// All mutation goes through keyed writes on a single item (and for images,
/// a single slot), so concurrent jobs on the same item never overwrite each
/// other's slots.
#[derive(Debug, Clone, Default)]
pub struct ItemBoard {
    items: Arc<RwLock<Vec<ContentItem>>>,
}

impl ItemBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the board contents for a new search, returning the old items.
    pub async fn replace_all(&self, items: Vec<ContentItem>) -> Vec<ContentItem> {
        std::mem::replace(&mut *self.items.write().await, items)
    }

    pub async fn snapshot(&self) -> Vec<ContentItem> {
        self.items.read().await.clone()
    }

    pub async fn get(&self, item_id: &ItemId) -> Option<ContentItem> {
        self.items
            .read()
            .await
            .iter()
            .find(|item| &item.id == item_id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Apply `f` to one item under the write lock.
    pub async fn update<F, R>(&self, item_id: &ItemId, f: F) -> WorkerResult<R>
    where
        F: FnOnce(&mut ContentItem) -> R,
    {
        let mut items = self.items.write().await;
        let item = items
            .iter_mut()
            .find(|item| &item.id == item_id)
            .ok_or_else(|| WorkerError::ItemNotFound(item_id.clone()))?;
        Ok(f(item))
    }

    /// Write one image slot, returning the previous state.
    pub async fn set_image_slot(
        &self,
        item_id: &ItemId,
        index: usize,
        slot: SceneSlot,
    ) -> WorkerResult<SceneSlot> {
        self.update(item_id, |item| {
            let previous = item
                .image(index)
                .cloned()
                .ok_or(WorkerError::InvalidSceneIndex {
                    index,
                    scene_count: item.scene_count(),
                })?;
            item.set_image(index, slot);
            Ok(previous)
        })
        .await?
    }

    /// Put back `prior` on a slot that `owner` claimed.
    ///
    /// Nothing is written unless `owner` still holds the in-progress claim;
    /// a slot resolved or re-claimed by another job is left alone. A prior
    /// in-progress state is restored as empty. Returns the slot written.
    pub async fn restore_image_slot(
        &self,
        item_id: &ItemId,
        index: usize,
        owner: &JobId,
        prior: SceneSlot,
    ) -> WorkerResult<Option<SceneSlot>> {
        let restored = if prior.is_in_progress() {
            SceneSlot::Empty
        } else {
            prior
        };
        self.update(item_id, |item| {
            let claimed = item
                .image(index)
                .is_some_and(|slot| slot.is_claimed_by(owner));
            if claimed {
                item.set_image(index, restored.clone());
                Some(restored)
            } else {
                None
            }
        })
        .await
    }

    /// Audio counterpart of [`Self::restore_image_slot`].
    pub async fn restore_audio(
        &self,
        item_id: &ItemId,
        owner: &JobId,
        prior: AudioState,
    ) -> WorkerResult<Option<AudioState>> {
        let restored = match prior {
            AudioState::InProgress { .. } => AudioState::Absent,
            other => other,
        };
        self.update(item_id, |item| {
            if item.audio.is_claimed_by(owner) {
                item.audio = restored.clone();
                Some(restored)
            } else {
                None
            }
        })
        .await
    }

    /// Write the audio state, returning the previous state.
    pub async fn set_audio(&self, item_id: &ItemId, audio: AudioState) -> WorkerResult<AudioState> {
        self.update(item_id, |item| std::mem::replace(&mut item.audio, audio))
            .await
    }
}
