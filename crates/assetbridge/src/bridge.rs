//! The AssetBridge: a local store federated with remote domains.
//!
//! Wires a local store, a transport and a discoverer into a [`Replicator`],
//! with a response cache in front of the transport, and adds batch
//! operations over many roots.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use assetbridge_core::{unqualify, Endpoint, ObjectId};
use assetbridge_store::AssetStore;
use assetbridge_sync::{
    CacheConfig, CachedTransport, Discoverer, Outcome, ReplicationError, ReplicationReport,
    Replicator, ReplicatorConfig, Transport,
};

use crate::error::Result;

/// Configuration for the bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Replication configuration.
    pub replicator: ReplicatorConfig,
    /// Response cache in front of the transport. Off unless a ttl is set.
    pub cache: CacheConfig,
}

/// Result of one root in a batch call.
#[derive(Debug)]
pub struct BatchEntry {
    pub root: ObjectId,
    pub result: Result<ReplicationReport>,
}

/// A local asset store federated with remote domains.
pub struct AssetBridge<S, T, D> {
    store: Arc<S>,
    replicator: Replicator<Arc<S>, CachedTransport<T>, D>,
}

impl<S, T, D> AssetBridge<S, T, D>
where
    S: AssetStore,
    T: Transport,
    D: Discoverer,
{
    /// Create a new bridge instance.
    pub fn new(store: S, transport: T, discoverer: D, config: BridgeConfig) -> Self {
        let store = Arc::new(store);
        let transport = CachedTransport::new(transport, &config.cache);
        let replicator = Replicator::new(
            Arc::clone(&store),
            transport,
            discoverer,
            config.replicator,
        );
        Self { store, replicator }
    }

    /// Get the local store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn replicator(&self) -> &Replicator<Arc<S>, CachedTransport<T>, D> {
        &self.replicator
    }

    /// Pull `root` and its graph from `origin`.
    pub async fn fetch_graph(&self, root: &ObjectId, origin: &Endpoint) -> Result<ReplicationReport> {
        Ok(self.replicator.fetch_graph(root, origin).await?.into_result()?)
    }

    /// Pull the graph named by a qualified id, `<endpoint>/<id>`.
    ///
    /// An id that does not parse fails with
    /// [`ReplicationError::MalformedIdentifier`].
    pub async fn fetch_qualified(&self, qualified: &str) -> Result<ReplicationReport> {
        let (origin, root) = unqualify(qualified).map_err(ReplicationError::from)?;
        self.fetch_graph(&root, &origin).await
    }

    /// Push `root` and its graph to `destination`.
    pub async fn publish_graph(
        &self,
        root: &ObjectId,
        destination: &Endpoint,
    ) -> Result<ReplicationReport> {
        Ok(self
            .replicator
            .publish_graph(root, destination)
            .await?
            .into_result()?)
    }

    /// Cancellable [`fetch_graph`](Self::fetch_graph).
    pub async fn fetch_graph_with_cancel(
        &self,
        root: &ObjectId,
        origin: &Endpoint,
        cancel: &CancellationToken,
    ) -> Result<Outcome> {
        Ok(self
            .replicator
            .fetch_graph_with_cancel(root, origin, cancel)
            .await?)
    }

    /// Cancellable [`publish_graph`](Self::publish_graph).
    pub async fn publish_graph_with_cancel(
        &self,
        root: &ObjectId,
        destination: &Endpoint,
        cancel: &CancellationToken,
    ) -> Result<Outcome> {
        Ok(self
            .replicator
            .publish_graph_with_cancel(root, destination, cancel)
            .await?)
    }

    /// Fetch many roots from one origin.
    ///
    /// A failing root does not stop the batch. Entries come back in input
    /// order.
    pub async fn fetch_all(
        &self,
        roots: impl IntoIterator<Item = ObjectId>,
        origin: &Endpoint,
    ) -> Vec<BatchEntry> {
        let entries: Vec<BatchEntry> = stream::iter(roots)
            .map(|root| async move {
                let result = self.fetch_graph(&root, origin).await;
                BatchEntry { root, result }
            })
            .buffered(self.batch_width())
            .collect()
            .await;
        log_batch("fetch", origin, &entries);
        entries
    }

    /// Publish many roots to one destination.
    pub async fn publish_all(
        &self,
        roots: impl IntoIterator<Item = ObjectId>,
        destination: &Endpoint,
    ) -> Vec<BatchEntry> {
        let entries: Vec<BatchEntry> = stream::iter(roots)
            .map(|root| async move {
                let result = self.publish_graph(&root, destination).await;
                BatchEntry { root, result }
            })
            .buffered(self.batch_width())
            .collect()
            .await;
        log_batch("publish", destination, &entries);
        entries
    }

    fn batch_width(&self) -> usize {
        self.replicator.config().max_concurrency.max(1)
    }
}

fn log_batch(direction: &str, endpoint: &Endpoint, entries: &[BatchEntry]) {
    let failed = entries.iter().filter(|e| e.result.is_err()).count();
    let count: usize = entries
        .iter()
        .filter_map(|e| e.result.as_ref().ok())
        .map(ReplicationReport::count)
        .sum();
    tracing::info!(
        direction,
        endpoint = %endpoint,
        roots = entries.len(),
        failed,
        count,
        "batch replication finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_config_from_json() {
        let config: BridgeConfig = serde_json::from_str(
            r#"{"replicator": {"max_concurrency": 4}, "cache": {"ttl": 0}}"#,
        )
        .unwrap();
        assert_eq!(config.replicator.max_concurrency, 4);
        assert_eq!(
            config.replicator.request_timeout,
            ReplicatorConfig::default().request_timeout
        );
        assert_eq!(config.cache.ttl, Duration::ZERO);
    }
}
