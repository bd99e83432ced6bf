//! SQLite implementation of the AssetStore trait.
//!
//! The persistent backend. Uses rusqlite with bundled SQLite, wrapped in
//! async via `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use assetbridge_core::{Asset, AssetBuilder, ContentHash, ContentKind, ObjectId};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{AssetStore, PutResult};

/// SQLite-based store implementation.
///
/// Thread-safe via an internal Mutex. Every call runs on the blocking pool.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        tracing::debug!(path = %path.display(), "opened sqlite asset store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

/// Raw column values of one `assets` row.
struct AssetRow {
    id: String,
    full_id: String,
    name: String,
    description: String,
    kind: u8,
    creator_id: String,
    temporary: bool,
    local: bool,
    data: Vec<u8>,
}

impl AssetRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            full_id: row.get("full_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            kind: row.get("kind")?,
            creator_id: row.get("creator_id")?,
            temporary: row.get("temporary")?,
            local: row.get("local")?,
            data: row.get("data")?,
        })
    }

    fn into_asset(self) -> Result<Asset> {
        let kind = ContentKind::from_u8(self.kind).ok_or_else(|| {
            StoreError::InvalidData(format!("asset {} has unknown kind {}", self.id, self.kind))
        })?;

        Ok(AssetBuilder::new(self.id, kind)
            .full_id(self.full_id)
            .name(self.name)
            .description(self.description)
            .creator(self.creator_id)
            .data(self.data)
            .temporary(self.temporary)
            .local(self.local)
            .build())
    }
}

#[async_trait]
impl AssetStore for SqliteStore {
    async fn get(&self, id: &ObjectId) -> Result<Option<Asset>> {
        let id = id.clone();

        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT id, full_id, name, description, kind, creator_id,
                            temporary, local, data
                     FROM assets WHERE id = ?1",
                    params![id.as_str()],
                    AssetRow::from_row,
                )
                .optional()?;

            row.map(AssetRow::into_asset).transpose()
        })
        .await
    }

    async fn put(&self, asset: &Asset) -> Result<PutResult> {
        let asset = asset.clone();

        self.with_conn(move |conn| {
            let hash = asset.content_hash();
            let tx = conn.transaction()?;

            let existing: Option<Vec<u8>> = tx
                .query_row(
                    "SELECT content_hash FROM assets WHERE id = ?1",
                    params![asset.id().as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            let result = match existing {
                Some(bytes) => {
                    let existing = ContentHash::try_from(bytes.as_slice()).map_err(|_| {
                        StoreError::InvalidData(format!(
                            "asset {} has a malformed content hash",
                            asset.id()
                        ))
                    })?;
                    if existing == hash {
                        return Ok(PutResult::Unchanged);
                    }
                    PutResult::Overwritten
                }
                None => PutResult::Inserted,
            };

            let flags = asset.flags();
            tx.execute(
                "INSERT INTO assets (
                    id, full_id, name, description, kind, creator_id,
                    temporary, local, data, content_hash, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ON CONFLICT(id) DO UPDATE SET
                    full_id = excluded.full_id,
                    name = excluded.name,
                    description = excluded.description,
                    kind = excluded.kind,
                    creator_id = excluded.creator_id,
                    temporary = excluded.temporary,
                    local = excluded.local,
                    data = excluded.data,
                    content_hash = excluded.content_hash,
                    stored_at = excluded.stored_at",
                params![
                    asset.id().as_str(),
                    asset.full_id().as_str(),
                    asset.name(),
                    asset.description(),
                    asset.kind().to_u8(),
                    asset.creator_id(),
                    flags.temporary,
                    flags.local,
                    asset.data().as_ref(),
                    hash.as_bytes().as_slice(),
                    now_millis(),
                ],
            )?;

            tx.commit()?;
            Ok(result)
        })
        .await
    }

    async fn contains(&self, id: &ObjectId) -> Result<bool> {
        let id = id.clone();

        self.with_conn(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM assets WHERE id = ?1)",
                params![id.as_str()],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
    }

    async fn count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM assets", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    async fn ids(&self) -> Result<Vec<ObjectId>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM assets ORDER BY id")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0).map(ObjectId::new))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids)
        })
        .await
    }
}
