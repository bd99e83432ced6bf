//! Per-call deduplication of object ids.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use assetbridge_core::ObjectId;

/// Ids already claimed by one replication call.
///
/// Owned by a single invocation; concurrent calls for different roots each
/// get their own set.
#[derive(Debug, Default)]
pub struct VisitedSet {
    inner: Mutex<HashSet<ObjectId>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `id`. Returns `false` if it was already claimed.
    ///
    /// Check and insert happen under one lock, so two workers can never both
    /// claim the same id.
    pub fn insert(&self, id: &ObjectId) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone())
    }
}
