//! Reference graph discovery.
//!
//! A [`Discoverer`] returns the full transitive closure of ids reachable from
//! a root. The replicator iterates that flat set once; any recursion lives
//! here.

use std::collections::{BTreeSet, HashMap, VecDeque};

use async_trait::async_trait;
use uuid::Uuid;

use assetbridge_core::{ContentKind, ObjectId};

use crate::error::{ReplicationError, Result};
use crate::source::AssetSource;

/// Computes the reference set of a root asset.
///
/// Implementations must be deterministic for a given payload and must never
/// include the root itself. Leaf kinds yield an empty set.
#[async_trait]
pub trait Discoverer: Send + Sync {
    /// Gather every id transitively referenced by `root`.
    ///
    /// `source` resolves ids whose payloads must be inspected to continue
    /// the traversal. It answers the root without another transfer.
    async fn gather(
        &self,
        source: &dyn AssetSource,
        root: &ObjectId,
        kind: ContentKind,
    ) -> Result<BTreeSet<ObjectId>>;
}

#[async_trait]
impl<D: Discoverer + ?Sized> Discoverer for std::sync::Arc<D> {
    async fn gather(
        &self,
        source: &dyn AssetSource,
        root: &ObjectId,
        kind: ContentKind,
    ) -> Result<BTreeSet<ObjectId>> {
        (**self).gather(source, root, kind).await
    }
}

/// A discoverer over a fixed table of direct references.
///
/// Useful when the reference graph is known up front (inventory manifests,
/// tests). Direct edges are expanded to their closure.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscoverer {
    edges: HashMap<ObjectId, Vec<ObjectId>>,
}

impl StaticDiscoverer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `from` directly references every id in `to`.
    pub fn with_edges(
        mut self,
        from: impl Into<ObjectId>,
        to: impl IntoIterator<Item = impl Into<ObjectId>>,
    ) -> Self {
        self.add_edges(from, to);
        self
    }

    pub fn add_edges(
        &mut self,
        from: impl Into<ObjectId>,
        to: impl IntoIterator<Item = impl Into<ObjectId>>,
    ) {
        self.edges
            .entry(from.into())
            .or_default()
            .extend(to.into_iter().map(Into::into));
    }

    /// The closure of `root` over the table, excluding `root`.
    pub fn closure(&self, root: &ObjectId) -> BTreeSet<ObjectId> {
        let mut found = BTreeSet::new();
        let mut queue = VecDeque::from([root]);

        while let Some(next) = queue.pop_front() {
            for child in self.edges.get(next).into_iter().flatten() {
                if child != root && found.insert(child.clone()) {
                    queue.push_back(child);
                }
            }
        }
        found
    }
}

#[async_trait]
impl Discoverer for StaticDiscoverer {
    async fn gather(
        &self,
        _source: &dyn AssetSource,
        root: &ObjectId,
        kind: ContentKind,
    ) -> Result<BTreeSet<ObjectId>> {
        if !kind.may_reference() {
            return Ok(BTreeSet::new());
        }
        Ok(self.closure(root))
    }
}

/// Length of a hyphenated UUID.
const UUID_LEN: usize = 36;
const HYPHENS: [usize; 4] = [8, 13, 18, 23];

/// Scan `data` for embedded hyphenated UUIDs, in order of first appearance.
///
/// A match must not be part of a longer run of hex digits. Nil UUIDs are
/// ignored.
pub fn scan_uuids(data: &[u8]) -> Vec<Uuid> {
    let mut found = Vec::new();
    let mut i = 0;

    while i + UUID_LEN <= data.len() {
        let window = &data[i..i + UUID_LEN];
        let bounded = (i == 0 || !data[i - 1].is_ascii_hexdigit())
            && data
                .get(i + UUID_LEN)
                .map_or(true, |b| !b.is_ascii_hexdigit());

        if bounded && looks_like_uuid(window) {
            if let Ok(uuid) = Uuid::try_parse_ascii(window) {
                if !uuid.is_nil() && !found.contains(&uuid) {
                    found.push(uuid);
                }
                i += UUID_LEN;
                continue;
            }
        }
        i += 1;
    }
    found
}

fn looks_like_uuid(window: &[u8]) -> bool {
    window.iter().enumerate().all(|(pos, b)| {
        if HYPHENS.contains(&pos) {
            *b == b'-'
        } else {
            b.is_ascii_hexdigit()
        }
    })
}

/// Discovers references by scanning payloads for embedded asset ids.
///
/// Every asset of a kind that may reference others is scanned; ids found in
/// it are added to the result and, when the source holds them, scanned in
/// turn. Ids the source cannot resolve are still reported so the replicator
/// can record them as missing.
#[derive(Debug, Clone)]
pub struct ReferenceScanner {
    max_depth: usize,
    max_nodes: usize,
}

impl ReferenceScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop expanding below `max_depth` levels and after `max_nodes` ids.
    pub fn with_limits(max_depth: usize, max_nodes: usize) -> Self {
        Self {
            max_depth,
            max_nodes,
        }
    }
}

impl Default for ReferenceScanner {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_nodes: 10_000,
        }
    }
}

#[async_trait]
impl Discoverer for ReferenceScanner {
    async fn gather(
        &self,
        source: &dyn AssetSource,
        root: &ObjectId,
        kind: ContentKind,
    ) -> Result<BTreeSet<ObjectId>> {
        let mut found = BTreeSet::new();
        if !kind.may_reference() {
            return Ok(found);
        }

        let root_asset = source
            .lookup(root)
            .await
            .map_err(|e| ReplicationError::Discovery {
                root: root.clone(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| ReplicationError::Discovery {
                root: root.clone(),
                reason: "root payload unavailable".into(),
            })?;

        let mut queue = VecDeque::from([(root_asset, 0usize)]);

        'scan: while let Some((asset, depth)) = queue.pop_front() {
            for uuid in scan_uuids(asset.data()) {
                let id = ObjectId::from(uuid);
                if &id == root || &id == asset.id() || found.contains(&id) {
                    continue;
                }
                if found.len() >= self.max_nodes {
                    tracing::warn!(root = %root, limit = self.max_nodes, "reference scan truncated");
                    break 'scan;
                }
                found.insert(id.clone());

                if depth + 1 >= self.max_depth {
                    continue;
                }
                match source.lookup(&id).await {
                    Ok(Some(child)) if child.kind().may_reference() => {
                        queue.push_back((child, depth + 1));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!(root = %root, id = %id, error = %e, "could not expand reference");
                    }
                }
            }
        }

        Ok(found)
    }
}
