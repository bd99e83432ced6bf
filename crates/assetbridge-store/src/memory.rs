//! In-memory implementation of the AssetStore trait.
//!
//! Same semantics as SQLite, nothing persisted. Used for tests and for
//! in-process domains.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use assetbridge_core::{Asset, ContentHash, ObjectId};

use crate::error::{Result, StoreError};
use crate::traits::{AssetStore, PutResult};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<HashMap<ObjectId, StoredAsset>>,
}

struct StoredAsset {
    asset: Asset,
    hash: ContentHash,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store pre-populated with `assets`.
    pub fn with_assets(assets: impl IntoIterator<Item = Asset>) -> Self {
        let map = assets
            .into_iter()
            .map(|asset| {
                let hash = asset.content_hash();
                (asset.id().clone(), StoredAsset { asset, hash })
            })
            .collect();
        Self {
            inner: RwLock::new(map),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".into())
}

#[async_trait]
impl AssetStore for MemoryStore {
    async fn get(&self, id: &ObjectId) -> Result<Option<Asset>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.get(id).map(|stored| stored.asset.clone()))
    }

    async fn put(&self, asset: &Asset) -> Result<PutResult> {
        let hash = asset.content_hash();
        let mut inner = self.inner.write().map_err(poisoned)?;

        let result = match inner.get(asset.id()) {
            Some(existing) if existing.hash == hash => return Ok(PutResult::Unchanged),
            Some(_) => PutResult::Overwritten,
            None => PutResult::Inserted,
        };

        inner.insert(
            asset.id().clone(),
            StoredAsset {
                asset: asset.clone(),
                hash,
            },
        );
        Ok(result)
    }

    async fn contains(&self, id: &ObjectId) -> Result<bool> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.contains_key(id))
    }

    async fn count(&self) -> Result<usize> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.len())
    }

    async fn ids(&self) -> Result<Vec<ObjectId>> {
        let inner = self.inner.read().map_err(poisoned)?;
        let mut ids: Vec<ObjectId> = inner.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetbridge_core::{AssetBuilder, ContentKind};

    fn make_asset(id: &str, data: &'static [u8]) -> Asset {
        AssetBuilder::new(id, ContentKind::Notecard)
            .name("note")
            .data(data)
            .build()
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();
        let asset = make_asset("a", b"payload");

        let result = store.put(&asset).await.unwrap();
        assert_eq!(result, PutResult::Inserted);

        let retrieved = store.get(asset.id()).await.unwrap().unwrap();
        assert_eq!(retrieved, asset);
        assert!(store.contains(asset.id()).await.unwrap());
        assert!(store.get(&ObjectId::new("b")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_idempotent() {
        let store = MemoryStore::new();
        let asset = make_asset("a", b"payload");

        assert_eq!(store.put(&asset).await.unwrap(), PutResult::Inserted);
        assert_eq!(store.put(&asset).await.unwrap(), PutResult::Unchanged);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_last_write_wins() {
        let store = MemoryStore::new();
        store.put(&make_asset("a", b"first")).await.unwrap();

        let second = make_asset("a", b"second");
        assert_eq!(store.put(&second).await.unwrap(), PutResult::Overwritten);

        let retrieved = store.get(&ObjectId::new("a")).await.unwrap().unwrap();
        assert_eq!(retrieved.data().as_ref(), b"second");
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ids_sorted() {
        let store = MemoryStore::with_assets([
            make_asset("c", b"3"),
            make_asset("a", b"1"),
            make_asset("b", b"2"),
        ]);
        let ids = store.ids().await.unwrap();
        assert_eq!(
            ids,
            vec![ObjectId::new("a"), ObjectId::new("b"), ObjectId::new("c")]
        );
    }
}
