//! Artifact storage for generated media.
//!
//! This crate provides:
//! - Byte storage keyed by artifact path
//! - `MediaRef` creation and resolution
//! - Prefix listing and cleanup between searches

pub mod error;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use store::{ArtifactStore, StoredObject};
