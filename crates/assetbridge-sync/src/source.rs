//! Read-only views used to resolve ids during discovery.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use assetbridge_core::{Asset, Endpoint, ObjectId};
use assetbridge_store::AssetStore;

use crate::error::Result;
use crate::transport::{with_timeout, Transport};

/// Where a discoverer looks up assets to expand nested references.
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn lookup(&self, id: &ObjectId) -> Result<Option<Asset>>;
}

/// The local store as a source.
pub struct LocalSource<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: AssetStore + ?Sized> LocalSource<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: AssetStore + ?Sized> AssetSource for LocalSource<'_, S> {
    async fn lookup(&self, id: &ObjectId) -> Result<Option<Asset>> {
        Ok(self.store.get(id).await?)
    }
}

/// A remote domain as a source. Every lookup carries the request timeout.
pub struct RemoteSource<'a, T: ?Sized> {
    transport: &'a T,
    endpoint: &'a Endpoint,
    timeout: Duration,
    permits: Option<&'a Semaphore>,
}

impl<'a, T: Transport + ?Sized> RemoteSource<'a, T> {
    pub fn new(transport: &'a T, endpoint: &'a Endpoint, timeout: Duration) -> Self {
        Self {
            transport,
            endpoint,
            timeout,
            permits: None,
        }
    }

    /// Hold a permit from `permits` for the duration of every lookup.
    pub fn with_permits(mut self, permits: &'a Semaphore) -> Self {
        self.permits = Some(permits);
        self
    }
}

#[async_trait]
impl<T: Transport + ?Sized> AssetSource for RemoteSource<'_, T> {
    async fn lookup(&self, id: &ObjectId) -> Result<Option<Asset>> {
        let _permit = match self.permits {
            Some(permits) => permits.acquire().await.ok(),
            None => None,
        };
        let asset = with_timeout(
            self.endpoint,
            self.timeout,
            self.transport.remote_get(self.endpoint, id),
        )
        .await?;
        Ok(asset)
    }
}

/// Answers one already-transferred asset from memory and delegates the rest.
pub(crate) struct SeededSource<'a> {
    seed: &'a Asset,
    inner: &'a dyn AssetSource,
}

impl<'a> SeededSource<'a> {
    pub(crate) fn new(seed: &'a Asset, inner: &'a dyn AssetSource) -> Self {
        Self { seed, inner }
    }
}

#[async_trait]
impl AssetSource for SeededSource<'_> {
    async fn lookup(&self, id: &ObjectId) -> Result<Option<Asset>> {
        if id == self.seed.id() {
            return Ok(Some(self.seed.clone()));
        }
        self.inner.lookup(id).await
    }
}

/// Keeps every answer of `inner`, so an id resolved while discovering is
/// not requested again when it is transferred.
pub(crate) struct RecordingSource<'a> {
    inner: &'a dyn AssetSource,
    answers: Mutex<HashMap<ObjectId, Option<Asset>>>,
}

impl<'a> RecordingSource<'a> {
    pub(crate) fn new(inner: &'a dyn AssetSource) -> Self {
        Self {
            inner,
            answers: Mutex::new(HashMap::new()),
        }
    }

    /// The recorded answer for `id`, if it was looked up.
    pub(crate) fn take(&self, id: &ObjectId) -> Option<Option<Asset>> {
        self.answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }
}

#[async_trait]
impl AssetSource for RecordingSource<'_> {
    async fn lookup(&self, id: &ObjectId) -> Result<Option<Asset>> {
        let answer = self.inner.lookup(id).await?;
        self.answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), answer.clone());
        Ok(answer)
    }
}
