//! Write-invalidated TTL cache over a transport.
//!
//! Assets returned by `remote_get` are reused for `ttl`. "Absent" answers and
//! errors always go to the remote store. Any `remote_post` clears the whole
//! cache, since a write at one endpoint may change what any cached read
//! would return.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use assetbridge_core::{Asset, Endpoint, ObjectId};

use crate::config::CacheConfig;
use crate::transport::{Result, Transport};

struct Entry {
    stored_at: Instant,
    asset: Asset,
}

/// A [`Transport`] decorator caching read responses.
pub struct CachedTransport<T> {
    inner: T,
    ttl: Duration,
    entries: Mutex<HashMap<(Endpoint, ObjectId), Entry>>,
}

impl<T: Transport> CachedTransport<T> {
    pub fn new(inner: T, config: &CacheConfig) -> Self {
        Self {
            inner,
            ttl: config.ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Number of entries currently held. Expired entries are evicted on the
    /// next insert.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn cached(&self, key: &(Endpoint, ObjectId)) -> Option<Asset> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.asset.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn store(&self, key: (Endpoint, ObjectId), asset: Asset) {
        let ttl = self.ttl;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        entries.insert(
            key,
            Entry {
                stored_at: Instant::now(),
                asset,
            },
        );
    }
}

#[async_trait]
impl<T: Transport> Transport for CachedTransport<T> {
    async fn remote_get(&self, endpoint: &Endpoint, id: &ObjectId) -> Result<Option<Asset>> {
        if self.ttl.is_zero() {
            return self.inner.remote_get(endpoint, id).await;
        }

        let key = (endpoint.clone(), id.clone());
        if let Some(asset) = self.cached(&key) {
            tracing::trace!(endpoint = %endpoint, id = %id, "cache hit");
            return Ok(Some(asset));
        }

        let response = self.inner.remote_get(endpoint, id).await?;
        if let Some(asset) = &response {
            self.store(key, asset.clone());
        }
        Ok(response)
    }

    async fn remote_post(&self, endpoint: &Endpoint, asset: &Asset) -> Result<()> {
        self.clear();
        self.inner.remote_post(endpoint, asset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use assetbridge_core::{AssetBuilder, ContentKind};
    use assetbridge_store::MemoryStore;

    use crate::transport::memory::{MemoryNetwork, MemoryTransport};

    fn asset(id: &str) -> Asset {
        AssetBuilder::new(id, ContentKind::Landmark).build()
    }

    async fn setup(ttl: Duration) -> (Arc<MemoryNetwork>, Endpoint, CachedTransport<MemoryTransport>) {
        let network = MemoryNetwork::new();
        let endpoint = Endpoint::new("http://search.example");
        network
            .register(endpoint.clone(), Arc::new(MemoryStore::with_assets([asset("a")])))
            .await;
        let cached = CachedTransport::new(network.transport(), &CacheConfig { ttl });
        (network, endpoint, cached)
    }

    #[tokio::test(start_paused = true)]
    async fn test_hits_within_ttl() {
        let (network, endpoint, cached) = setup(Duration::from_secs(30)).await;
        let id = ObjectId::new("a");

        assert!(cached.remote_get(&endpoint, &id).await.unwrap().is_some());
        assert!(cached.remote_get(&endpoint, &id).await.unwrap().is_some());
        assert_eq!(network.requests(&endpoint).gets.len(), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cached.remote_get(&endpoint, &id).await.unwrap().is_some());
        assert_eq!(network.requests(&endpoint).gets.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_goes_to_remote() {
        let (network, endpoint, cached) = setup(Duration::from_secs(30)).await;
        let id = ObjectId::new("late");

        assert!(cached.remote_get(&endpoint, &id).await.unwrap().is_none());
        assert!(cached.is_empty());

        // Appears at the origin after the first miss.
        network
            .register(
                endpoint.clone(),
                Arc::new(MemoryStore::with_assets([asset("a"), asset("late")])),
            )
            .await;
        assert!(cached.remote_get(&endpoint, &id).await.unwrap().is_some());
        assert_eq!(network.requests(&endpoint).gets.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_evicted_on_insert() {
        let network = MemoryNetwork::new();
        let endpoint = Endpoint::new("http://search.example");
        let assets: Vec<Asset> = (0..100).map(|i| asset(&format!("a{}", i))).collect();
        network
            .register(endpoint.clone(), Arc::new(MemoryStore::with_assets(assets)))
            .await;
        let cached = CachedTransport::new(
            network.transport(),
            &CacheConfig {
                ttl: Duration::from_secs(1),
            },
        );

        for i in 0..99 {
            let id = ObjectId::new(format!("a{}", i));
            cached.remote_get(&endpoint, &id).await.unwrap();
        }
        assert_eq!(cached.len(), 99);

        tokio::time::advance(Duration::from_secs(3600)).await;
        cached
            .remote_get(&endpoint, &ObjectId::new("a99"))
            .await
            .unwrap();
        assert_eq!(cached.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_clears_everything() {
        let (network, endpoint, cached) = setup(Duration::from_secs(30)).await;
        let other = Endpoint::new("http://elsewhere.example");
        network
            .register(other.clone(), Arc::new(MemoryStore::with_assets([asset("c")])))
            .await;

        cached.remote_get(&endpoint, &ObjectId::new("a")).await.unwrap();
        cached.remote_get(&other, &ObjectId::new("c")).await.unwrap();
        assert_eq!(cached.len(), 2);

        cached.remote_post(&other, &asset("b")).await.unwrap();
        assert!(cached.is_empty());

        assert!(cached
            .remote_get(&other, &ObjectId::new("b"))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_zero_ttl_disables() {
        let (network, endpoint, cached) = setup(Duration::ZERO).await;
        let id = ObjectId::new("a");

        cached.remote_get(&endpoint, &id).await.unwrap();
        cached.remote_get(&endpoint, &id).await.unwrap();
        assert_eq!(network.requests(&endpoint).gets.len(), 2);
        assert!(cached.is_empty());
    }
}
