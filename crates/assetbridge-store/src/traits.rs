//! AssetStore trait: the abstract interface for asset persistence.
//!
//! Both the local store and, behind a transport, every remote store speak
//! this contract.

use std::sync::Arc;

use async_trait::async_trait;
use assetbridge_core::{Asset, ObjectId};

use crate::error::Result;

/// Result of putting an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutResult {
    /// No asset was stored under this id before.
    Inserted,
    /// Identical content was already stored under this id (idempotent no-op).
    Unchanged,
    /// Different content was stored under this id and has been replaced.
    Overwritten,
}

impl PutResult {
    /// Whether the put modified the store.
    pub fn changed_store(&self) -> bool {
        !matches!(self, PutResult::Unchanged)
    }
}

/// Async interface for asset persistence.
///
/// # Design Notes
///
/// - Implementations must be safe under concurrent access.
/// - `put` compares [`Asset::content_hash`] with what is already stored:
///   equal content yields `Unchanged`, different content `Overwritten`.
/// - Objects are stored whole or not at all.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Get an asset by the key it is stored under.
    async fn get(&self, id: &ObjectId) -> Result<Option<Asset>>;

    /// Store an asset under [`Asset::id`].
    async fn put(&self, asset: &Asset) -> Result<PutResult>;

    /// Check if an asset exists.
    async fn contains(&self, id: &ObjectId) -> Result<bool>;

    /// Number of stored assets.
    async fn count(&self) -> Result<usize>;

    /// All stored ids, in ascending order.
    async fn ids(&self) -> Result<Vec<ObjectId>>;
}

#[async_trait]
impl<S: AssetStore + ?Sized> AssetStore for Arc<S> {
    async fn get(&self, id: &ObjectId) -> Result<Option<Asset>> {
        (**self).get(id).await
    }

    async fn put(&self, asset: &Asset) -> Result<PutResult> {
        (**self).put(asset).await
    }

    async fn contains(&self, id: &ObjectId) -> Result<bool> {
        (**self).contains(id).await
    }

    async fn count(&self) -> Result<usize> {
        (**self).count().await
    }

    async fn ids(&self) -> Result<Vec<ObjectId>> {
        (**self).ids().await
    }
}
