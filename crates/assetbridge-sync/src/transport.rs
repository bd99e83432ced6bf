//! Transport abstraction: talking to another domain's store.
//!
//! The replicator only needs "get this id from that endpoint" and "post this
//! asset to that endpoint". Whether that is HTTP, RPC or an in-process
//! channel is up to the implementation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use assetbridge_core::{Asset, Endpoint, ObjectId};

use crate::error::TransportError;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Transport to remote asset stores.
///
/// Implementations must be thread-safe (Send + Sync) and must transfer
/// assets whole.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `id` from the store at `endpoint`. `Ok(None)` means the store
    /// answered and does not hold the asset.
    async fn remote_get(&self, endpoint: &Endpoint, id: &ObjectId) -> Result<Option<Asset>>;

    /// Store `asset` at `endpoint` under [`Asset::id`].
    async fn remote_post(&self, endpoint: &Endpoint, asset: &Asset) -> Result<()>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn remote_get(&self, endpoint: &Endpoint, id: &ObjectId) -> Result<Option<Asset>> {
        (**self).remote_get(endpoint, id).await
    }

    async fn remote_post(&self, endpoint: &Endpoint, asset: &Asset) -> Result<()> {
        (**self).remote_post(endpoint, asset).await
    }
}

/// Bound a transport call by `after`, mapping expiry to [`TransportError::Timeout`].
pub async fn with_timeout<F, T>(endpoint: &Endpoint, after: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(after, call).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout {
            endpoint: endpoint.clone(),
            after,
        }),
    }
}

/// An in-process federation of stores, for tests and embedded deployments.
///
/// Every transfer goes through the wire codec, so a domain never shares an
/// asset value with another domain.
pub mod memory {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use assetbridge_core::{decode_asset, encode_asset};
    use assetbridge_store::AssetStore;
    use tokio::sync::RwLock;

    /// Failure injection for one domain.
    #[derive(Debug, Clone, Default)]
    pub struct Faults {
        /// Every request fails with `Unreachable`.
        pub offline: bool,
        /// Delay applied before each request is served.
        pub latency: Option<Duration>,
        /// Requests for these ids fail with `Rejected`.
        pub failing_ids: HashSet<ObjectId>,
        /// All posts fail with `Rejected`.
        pub reject_posts: bool,
        /// Requests for these ids never settle.
        pub stalled_ids: HashSet<ObjectId>,
    }

    #[derive(Clone)]
    struct Domain {
        store: Arc<dyn AssetStore>,
        faults: Faults,
    }

    /// Requests seen by one endpoint, in arrival order.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct RequestLog {
        pub gets: Vec<ObjectId>,
        pub posts: Vec<ObjectId>,
    }

    /// Shared state for the in-memory network.
    pub struct MemoryNetwork {
        domains: RwLock<HashMap<Endpoint, Domain>>,
        log: Mutex<HashMap<Endpoint, RequestLog>>,
    }

    impl MemoryNetwork {
        /// Create a new, empty network.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Serve `store` at `endpoint`, replacing any previous domain there.
        pub async fn register(&self, endpoint: Endpoint, store: Arc<dyn AssetStore>) {
            self.domains.write().await.insert(
                endpoint,
                Domain {
                    store,
                    faults: Faults::default(),
                },
            );
        }

        /// Replace the failure injection for `endpoint`.
        pub async fn set_faults(&self, endpoint: &Endpoint, faults: Faults) {
            if let Some(domain) = self.domains.write().await.get_mut(endpoint) {
                domain.faults = faults;
            }
        }

        /// A transport connected to this network.
        pub fn transport(self: &Arc<Self>) -> MemoryTransport {
            MemoryTransport {
                network: Arc::clone(self),
            }
        }

        /// Requests received by `endpoint` so far.
        pub fn requests(&self, endpoint: &Endpoint) -> RequestLog {
            self.log
                .lock()
                .map(|log| log.get(endpoint).cloned().unwrap_or_default())
                .unwrap_or_default()
        }

        fn record(&self, endpoint: &Endpoint, f: impl FnOnce(&mut RequestLog)) {
            if let Ok(mut log) = self.log.lock() {
                f(log.entry(endpoint.clone()).or_default());
            }
        }

        async fn domain(&self, endpoint: &Endpoint) -> Result<Domain> {
            let domain = self
                .domains
                .read()
                .await
                .get(endpoint)
                .cloned()
                .ok_or_else(|| TransportError::Unreachable(endpoint.clone()))?;

            if domain.faults.offline {
                return Err(TransportError::Unreachable(endpoint.clone()));
            }
            if let Some(latency) = domain.faults.latency {
                tokio::time::sleep(latency).await;
            }
            Ok(domain)
        }
    }

    impl Default for MemoryNetwork {
        fn default() -> Self {
            Self {
                domains: RwLock::new(HashMap::new()),
                log: Mutex::new(HashMap::new()),
            }
        }
    }

    /// In-memory transport implementation.
    #[derive(Clone)]
    pub struct MemoryTransport {
        network: Arc<MemoryNetwork>,
    }

    impl MemoryTransport {
        pub fn network(&self) -> &Arc<MemoryNetwork> {
            &self.network
        }
    }

    fn rejected(endpoint: &Endpoint, reason: impl ToString) -> TransportError {
        TransportError::Rejected {
            endpoint: endpoint.clone(),
            reason: reason.to_string(),
        }
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn remote_get(&self, endpoint: &Endpoint, id: &ObjectId) -> Result<Option<Asset>> {
            self.network.record(endpoint, |log| log.gets.push(id.clone()));
            let domain = self.network.domain(endpoint).await?;

            if domain.faults.stalled_ids.contains(id) {
                std::future::pending::<()>().await;
            }
            if domain.faults.failing_ids.contains(id) {
                return Err(rejected(endpoint, format!("failed to serve {}", id)));
            }

            let asset = domain
                .store
                .get(id)
                .await
                .map_err(|e| rejected(endpoint, e))?;

            match asset {
                Some(asset) => {
                    let wire = encode_asset(&asset)?;
                    Ok(Some(decode_asset(&wire)?))
                }
                None => Ok(None),
            }
        }

        async fn remote_post(&self, endpoint: &Endpoint, asset: &Asset) -> Result<()> {
            self.network
                .record(endpoint, |log| log.posts.push(asset.id().clone()));
            let domain = self.network.domain(endpoint).await?;

            if domain.faults.stalled_ids.contains(asset.id()) {
                std::future::pending::<()>().await;
            }
            if domain.faults.reject_posts || domain.faults.failing_ids.contains(asset.id()) {
                return Err(rejected(endpoint, format!("refused {}", asset.id())));
            }

            let wire = encode_asset(asset)?;
            let received = decode_asset(&wire)?;
            domain
                .store
                .put(&received)
                .await
                .map_err(|e| rejected(endpoint, e))?;
            Ok(())
        }
    }
}
