//! In-memory artifact store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use storyreel_models::MediaRef;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{StorageError, StorageResult};

/// A stored object.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Arc<[u8]>,
    pub content_type: String,
    pub stored_at: DateTime<Utc>,
}

/// Byte store that backs every ready image and narration reference.
///
/// Cloning is cheap; clones share the same objects.
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
}

fn validate_key(key: &str) -> StorageResult<()> {
    if key.trim().is_empty()
        || key.starts_with('/')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..")
    {
        return Err(StorageError::invalid_key(key));
    }
    Ok(())
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store bytes under `key`, replacing any previous object.
    pub async fn put_bytes(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<MediaRef> {
        validate_key(key)?;
        let byte_len = data.len() as u64;
        debug!("Storing {} bytes at {}", byte_len, key);

        let object = StoredObject {
            data: Arc::from(data),
            content_type: content_type.to_string(),
            stored_at: Utc::now(),
        };
        self.objects.write().await.insert(key.to_string(), object);

        Ok(MediaRef::new(key, content_type, byte_len))
    }

    /// Fetch an object by key.
    pub async fn get(&self, key: &str) -> StorageResult<StoredObject> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    /// Resolve a media reference to its bytes.
    pub async fn fetch(&self, media: &MediaRef) -> StorageResult<Arc<[u8]>> {
        self.get(&media.key).await.map(|object| object.data)
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }

    /// Delete an object. Returns whether it existed.
    pub async fn delete(&self, key: &str) -> bool {
        let removed = self.objects.write().await.remove(key).is_some();
        if removed {
            debug!("Deleted {}", key);
        }
        removed
    }

    /// Delete every object under `prefix`, returning how many were removed.
    pub async fn delete_prefix(&self, prefix: &str) -> usize {
        let mut objects = self.objects.write().await;
        let before = objects.len();
        objects.retain(|key, _| !key.starts_with(prefix));
        before - objects.len()
    }

    /// Keys under `prefix`, sorted.
    pub async fn list(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .read()
            .await
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}
