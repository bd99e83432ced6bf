//! Graph replication between the local store and a remote domain.
//!
//! Both directions follow the same shape: transfer the root (any failure is
//! fatal), discover its reference set, then transfer every dependency with
//! bounded concurrency. Dependency failures are recorded in the
//! [`ReplicationReport`] and never abort the call.

use std::future::Future;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use assetbridge_core::{qualify, Asset, Endpoint, ObjectId};
use assetbridge_store::AssetStore;

use crate::config::ReplicatorConfig;
use crate::discovery::Discoverer;
use crate::error::{ReplicationError, Result, TransportError};
use crate::source::{AssetSource, LocalSource, RecordingSource, RemoteSource, SeededSource};
use crate::transport::{with_timeout, Transport};
use crate::visited::VisitedSet;

/// Direction of a replication call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Remote domain into the local store.
    Fetch,
    /// Local store out to a remote domain.
    Publish,
}

/// What happened to every object of one graph.
///
/// All lists are sorted by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationReport {
    pub root: ObjectId,
    pub endpoint: Endpoint,
    pub direction: Direction,
    /// Objects stored locally (fetch) or posted (publish), root included.
    pub transferred: Vec<ObjectId>,
    /// Dependencies already held locally and not requested again.
    pub already_present: Vec<ObjectId>,
    /// Dependencies absent at their source.
    pub missing: Vec<ObjectId>,
    /// Ephemeral objects never published.
    pub skipped: Vec<ObjectId>,
    /// Objects whose id could not be qualified.
    pub malformed: Vec<(ObjectId, String)>,
    /// Dependencies whose transfer failed.
    pub failed: Vec<(ObjectId, String)>,
    /// Dependencies never dispatched because the call was cancelled.
    pub undispatched: Vec<ObjectId>,
}

impl ReplicationReport {
    fn new(root: &ObjectId, endpoint: &Endpoint, direction: Direction) -> Self {
        Self {
            root: root.clone(),
            endpoint: endpoint.clone(),
            direction,
            transferred: Vec::new(),
            already_present: Vec::new(),
            missing: Vec::new(),
            skipped: Vec::new(),
            malformed: Vec::new(),
            failed: Vec::new(),
            undispatched: Vec::new(),
        }
    }

    /// Objects successfully stored (fetch) or published (publish).
    pub fn count(&self) -> usize {
        self.transferred.len() + self.already_present.len()
    }

    /// Whether every object of the graph made it across.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
            && self.malformed.is_empty()
            && self.failed.is_empty()
            && self.undispatched.is_empty()
    }

    fn record(&mut self, item: Item) {
        match item {
            Item::Transferred(id) => self.transferred.push(id),
            Item::Present(id) => self.already_present.push(id),
            Item::Missing(id) => self.missing.push(id),
            Item::Skipped(id) => self.skipped.push(id),
            Item::Malformed(id, reason) => self.malformed.push((id, reason)),
            Item::Failed(id, reason) => self.failed.push((id, reason)),
        }
    }

    fn finish(&mut self) {
        self.transferred.sort();
        self.already_present.sort();
        self.missing.sort();
        self.skipped.sort();
        self.malformed.sort();
        self.failed.sort();
        self.undispatched.sort();
    }
}

/// How a replication call settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every dependency was attempted.
    Completed(ReplicationReport),
    /// The caller cancelled; in-flight transfers were allowed to settle.
    Cancelled(ReplicationReport),
}

impl Outcome {
    pub fn report(&self) -> &ReplicationReport {
        match self {
            Outcome::Completed(report) | Outcome::Cancelled(report) => report,
        }
    }

    pub fn into_report(self) -> ReplicationReport {
        match self {
            Outcome::Completed(report) | Outcome::Cancelled(report) => report,
        }
    }

    pub fn count(&self) -> usize {
        self.report().count()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled(_))
    }

    /// The report of a completed call, or `Cancelled` as an error.
    pub fn into_result(self) -> Result<ReplicationReport> {
        match self {
            Outcome::Completed(report) => Ok(report),
            Outcome::Cancelled(report) => Err(ReplicationError::Cancelled {
                completed: report.count(),
            }),
        }
    }
}

/// Settled state of one dependency.
enum Item {
    Transferred(ObjectId),
    Present(ObjectId),
    Missing(ObjectId),
    Skipped(ObjectId),
    Malformed(ObjectId, String),
    Failed(ObjectId, String),
}

/// An asset ready to leave for another domain, or why it may not.
enum Outbound {
    Ready(Asset),
    Ephemeral,
    Malformed(String),
}

/// Replicates asset graphs between a local store and remote domains.
///
/// Holds no per-call state: every call owns its [`VisitedSet`], so calls for
/// different roots may run concurrently on one replicator. The shared
/// semaphore bounds the total number of transfers in flight.
pub struct Replicator<S, T, D> {
    store: S,
    transport: T,
    discoverer: D,
    config: ReplicatorConfig,
    permits: Arc<Semaphore>,
}

impl<S, T, D> Replicator<S, T, D>
where
    S: AssetStore,
    T: Transport,
    D: Discoverer,
{
    pub fn new(store: S, transport: T, discoverer: D, config: ReplicatorConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
        Self {
            store,
            transport,
            discoverer,
            config,
            permits,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &ReplicatorConfig {
        &self.config
    }

    /// Copy `root` and its reference graph from `origin` into the local store.
    pub async fn fetch_graph(&self, root: &ObjectId, origin: &Endpoint) -> Result<Outcome> {
        self.fetch_graph_with_cancel(root, origin, &CancellationToken::new())
            .await
    }

    /// [`fetch_graph`](Self::fetch_graph) that stops dispatching once
    /// `cancel` fires.
    ///
    /// Objects are stored under the id they have at the origin; no
    /// re-qualification is applied on fetch.
    pub async fn fetch_graph_with_cancel(
        &self,
        root: &ObjectId,
        origin: &Endpoint,
        cancel: &CancellationToken,
    ) -> Result<Outcome> {
        let mut report = ReplicationReport::new(root, origin, Direction::Fetch);
        if cancel.is_cancelled() {
            return Ok(Outcome::Cancelled(report));
        }

        let asset = self
            .remote_get(origin, root)
            .await?
            .ok_or_else(|| ReplicationError::AssetNotFound {
                id: root.clone(),
                location: origin.to_string(),
            })?;
        self.store.put(&asset).await?;
        tracing::debug!(root = %root, endpoint = %origin, "fetched root");
        report.transferred.push(root.clone());

        let remote = RemoteSource::new(&self.transport, origin, self.config.request_timeout)
            .with_permits(&self.permits);
        let recorded = RecordingSource::new(&remote);
        let source = SeededSource::new(&asset, &recorded);
        let references = self.discover(&source, &asset).await?;

        let visited = VisitedSet::new();
        visited.insert(root);
        let recorded = &recorded;
        let cancelled = self
            .fan_out(references, &visited, cancel, &mut report, move |id| {
                self.fetch_one(origin, root, id, recorded)
            })
            .await;

        Ok(self.settle(report, cancelled))
    }

    /// Copy `root` and its reference graph from the local store to `destination`.
    pub async fn publish_graph(&self, root: &ObjectId, destination: &Endpoint) -> Result<Outcome> {
        self.publish_graph_with_cancel(root, destination, &CancellationToken::new())
            .await
    }

    /// [`publish_graph`](Self::publish_graph) that stops dispatching once
    /// `cancel` fires.
    ///
    /// Every posted copy is keyed by `qualify(destination, id)`. Ephemeral
    /// objects (temporary and not local) are never posted.
    pub async fn publish_graph_with_cancel(
        &self,
        root: &ObjectId,
        destination: &Endpoint,
        cancel: &CancellationToken,
    ) -> Result<Outcome> {
        let mut report = ReplicationReport::new(root, destination, Direction::Publish);
        if cancel.is_cancelled() {
            return Ok(Outcome::Cancelled(report));
        }

        let asset = self
            .store
            .get(root)
            .await?
            .ok_or_else(|| ReplicationError::AssetNotFound {
                id: root.clone(),
                location: "local store".into(),
            })?;

        match outbound(destination, &asset) {
            Outbound::Ready(copy) => {
                self.remote_post(destination, &copy).await?;
                tracing::debug!(root = %root, endpoint = %destination, key = %copy.id(), "published root");
                report.transferred.push(root.clone());
            }
            Outbound::Ephemeral => {
                tracing::warn!(root = %root, endpoint = %destination, "root is ephemeral, not publishing it");
                report.skipped.push(root.clone());
            }
            Outbound::Malformed(reason) => {
                tracing::warn!(root = %root, endpoint = %destination, %reason, "root id cannot be qualified");
                report.malformed.push((root.clone(), reason));
            }
        }

        let local = LocalSource::new(&self.store);
        let source = SeededSource::new(&asset, &local);
        let references = self.discover(&source, &asset).await?;

        let visited = VisitedSet::new();
        visited.insert(root);
        let cancelled = self
            .fan_out(references, &visited, cancel, &mut report, move |id| {
                self.publish_one(destination, root, id)
            })
            .await;

        Ok(self.settle(report, cancelled))
    }

    async fn discover(
        &self,
        source: &dyn AssetSource,
        root: &Asset,
    ) -> Result<std::collections::BTreeSet<ObjectId>> {
        self.discoverer
            .gather(source, root.id(), root.kind())
            .await
            .map_err(|e| match e {
                ReplicationError::Discovery { .. } => e,
                other => ReplicationError::Discovery {
                    root: root.id().clone(),
                    reason: other.to_string(),
                },
            })
    }

    /// Run `transfer` for every unvisited id, at most `max_concurrency` at a
    /// time. Returns whether the call was cancelled.
    async fn fan_out<F, Fut>(
        &self,
        references: impl IntoIterator<Item = ObjectId>,
        visited: &VisitedSet,
        cancel: &CancellationToken,
        report: &mut ReplicationReport,
        transfer: F,
    ) -> bool
    where
        F: Fn(ObjectId) -> Fut,
        Fut: Future<Output = Item>,
    {
        let limit = self.config.max_concurrency.max(1);
        let mut pending = references.into_iter().filter(|id| visited.insert(id));
        let mut in_flight = FuturesUnordered::new();
        let mut cancelled = false;

        loop {
            if cancel.is_cancelled() {
                cancelled = true;
            }
            while !cancelled && in_flight.len() < limit {
                match pending.next() {
                    Some(id) => in_flight.push(transfer(id)),
                    None => break,
                }
            }
            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled(), if !cancelled => cancelled = true,
                Some(item) = in_flight.next() => report.record(item),
                else => break,
            }
        }

        if cancelled {
            report.undispatched.extend(pending);
        }
        cancelled
    }

    async fn fetch_one(
        &self,
        origin: &Endpoint,
        root: &ObjectId,
        id: ObjectId,
        recorded: &RecordingSource<'_>,
    ) -> Item {
        if self.config.skip_present {
            match self.store.contains(&id).await {
                Ok(true) => {
                    tracing::debug!(root = %root, id = %id, "dependency already present");
                    return Item::Present(id);
                }
                Ok(false) => {}
                Err(e) => return failed(root, origin, id, e),
            }
        }

        // Answers seen during discovery are not requested again.
        let response = match recorded.take(&id) {
            Some(answer) => Ok(answer),
            None => self.remote_get(origin, &id).await,
        };

        match response {
            Ok(Some(asset)) => match self.store.put(&asset).await {
                Ok(_) => {
                    tracing::debug!(root = %root, id = %id, "fetched dependency");
                    Item::Transferred(id)
                }
                Err(e) => failed(root, origin, id, e),
            },
            Ok(None) => {
                tracing::warn!(root = %root, endpoint = %origin, id = %id, "dependency missing at origin");
                Item::Missing(id)
            }
            Err(e) => failed(root, origin, id, e),
        }
    }

    async fn publish_one(&self, destination: &Endpoint, root: &ObjectId, id: ObjectId) -> Item {
        let asset = match self.store.get(&id).await {
            Ok(Some(asset)) => asset,
            Ok(None) => {
                tracing::warn!(root = %root, id = %id, "dependency missing from local store");
                return Item::Missing(id);
            }
            Err(e) => return failed(root, destination, id, e),
        };

        match outbound(destination, &asset) {
            Outbound::Ready(copy) => match self.remote_post(destination, &copy).await {
                Ok(()) => {
                    tracing::debug!(root = %root, id = %id, key = %copy.id(), "published dependency");
                    Item::Transferred(id)
                }
                Err(e) => failed(root, destination, id, e),
            },
            Outbound::Ephemeral => {
                tracing::debug!(root = %root, id = %id, "skipping ephemeral dependency");
                Item::Skipped(id)
            }
            Outbound::Malformed(reason) => {
                tracing::warn!(root = %root, id = %id, %reason, "dependency id cannot be qualified");
                Item::Malformed(id, reason)
            }
        }
    }

    async fn remote_get(
        &self,
        endpoint: &Endpoint,
        id: &ObjectId,
    ) -> std::result::Result<Option<Asset>, TransportError> {
        let _permit = self.permits.acquire().await.ok();
        with_timeout(
            endpoint,
            self.config.request_timeout,
            self.transport.remote_get(endpoint, id),
        )
        .await
    }

    async fn remote_post(
        &self,
        endpoint: &Endpoint,
        asset: &Asset,
    ) -> std::result::Result<(), TransportError> {
        let _permit = self.permits.acquire().await.ok();
        with_timeout(
            endpoint,
            self.config.request_timeout,
            self.transport.remote_post(endpoint, asset),
        )
        .await
    }

    fn settle(&self, mut report: ReplicationReport, cancelled: bool) -> Outcome {
        report.finish();
        if cancelled {
            tracing::info!(
                root = %report.root,
                endpoint = %report.endpoint,
                count = report.count(),
                undispatched = report.undispatched.len(),
                "replication cancelled"
            );
            Outcome::Cancelled(report)
        } else {
            tracing::info!(
                root = %report.root,
                endpoint = %report.endpoint,
                direction = ?report.direction,
                count = report.count(),
                missing = report.missing.len(),
                failed = report.failed.len(),
                "replicated graph"
            );
            Outcome::Completed(report)
        }
    }
}

fn outbound(destination: &Endpoint, asset: &Asset) -> Outbound {
    if asset.is_ephemeral() {
        return Outbound::Ephemeral;
    }
    match qualify(destination, asset.id()) {
        Ok(qualified) => Outbound::Ready(asset.requalified(qualified.to_object_id())),
        Err(e) => Outbound::Malformed(e.to_string()),
    }
}

fn failed(root: &ObjectId, endpoint: &Endpoint, id: ObjectId, error: impl std::fmt::Display) -> Item {
    tracing::warn!(root = %root, endpoint = %endpoint, id = %id, error = %error, "dependency transfer failed");
    Item::Failed(id, error.to_string())
}
