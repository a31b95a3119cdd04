use super::{MetadataStore, StoreError};
use crate::services::{CatalogFormat, CatalogRecord, CatalogType};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS catalogs (
    id           TEXT PRIMARY KEY,
    owner        TEXT NOT NULL,
    catalog_type TEXT NOT NULL,
    name         TEXT NOT NULL,
    format       TEXT NOT NULL,
    created      TEXT NOT NULL,
    UNIQUE (owner, catalog_type, name)
);";

const RECORD_COLUMNS: &str = "id, owner, catalog_type, name, format, created";

enum PendingOp {
    Insert(CatalogRecord),
    Update(CatalogRecord),
    Delete(String),
}

struct Inner {
    conn: Connection,
    pending: Vec<PendingOp>,
}

/// SQLite-backed [`MetadataStore`].
///
/// One connection, one unit of work at a time: staged operations collect in
/// a buffer, `flush` replays them inside an explicit transaction, `commit`
/// ends it. The UNIQUE constraint on `(owner, catalog_type, name)` backstops
/// the duplicate check when two connections race on the same file.
pub struct SqliteMetadataStore {
    inner: Mutex<Inner>,
}

impl SqliteMetadataStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).with_context(|| {
            format!(
                "Failed to open metadata store at {}",
                path.as_ref().display()
            )
        })?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory metadata store")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize catalog schema")?;
        Ok(Self {
            inner: Mutex::new(Inner {
                conn,
                pending: Vec::new(),
            }),
        })
    }
}

impl Inner {
    fn exists(&self, owner: &str, catalog_type: CatalogType, name: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM catalogs WHERE owner = ?1 AND catalog_type = ?2 AND name = ?3",
                params![owner, catalog_type.as_str(), name],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query catalog existence")?;
        Ok(found.is_some())
    }

    fn apply_pending(&mut self) -> Result<(), StoreError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        if self.conn.is_autocommit() {
            self.conn
                .execute_batch("BEGIN IMMEDIATE")
                .context("Failed to begin catalog transaction")?;
        }
        let Inner { conn, pending } = self;
        for op in pending.drain(..) {
            match op {
                PendingOp::Insert(record) => {
                    let result = conn.execute(
                        "INSERT INTO catalogs (id, owner, catalog_type, name, format, created) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![
                            record.id,
                            record.owner,
                            record.catalog_type.as_str(),
                            record.name,
                            record.format.as_str(),
                            record.created.to_rfc3339(),
                        ],
                    );
                    match result {
                        Ok(_) => {},
                        Err(rusqlite::Error::SqliteFailure(e, _))
                            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                        {
                            return Err(StoreError::Duplicate(record.name));
                        },
                        Err(e) => {
                            return Err(StoreError::Backend(
                                anyhow::Error::new(e).context("Failed to insert catalog record"),
                            ));
                        },
                    }
                },
                PendingOp::Update(record) => {
                    conn.execute(
                        "UPDATE catalogs SET format = ?1, created = ?2 WHERE id = ?3",
                        params![
                            record.format.as_str(),
                            record.created.to_rfc3339(),
                            record.id,
                        ],
                    )
                    .context("Failed to update catalog record")?;
                },
                PendingOp::Delete(id) => {
                    conn.execute("DELETE FROM catalogs WHERE id = ?1", params![id])
                        .context("Failed to delete catalog record")?;
                },
            }
        }
        Ok(())
    }
}

type RawRecord = (String, String, String, String, String, String);

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn parse_record(raw: RawRecord) -> Result<CatalogRecord> {
    let (id, owner, catalog_type, name, format, created) = raw;
    Ok(CatalogRecord {
        id,
        owner,
        catalog_type: catalog_type.parse()?,
        name,
        format: format.parse()?,
        created: DateTime::parse_from_rfc3339(&created)
            .context("Corrupt created column")?
            .with_timezone(&Utc),
    })
}

#[async_trait::async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn create(
        &self,
        owner: &str,
        catalog_type: CatalogType,
        name: &str,
        format: CatalogFormat,
    ) -> Result<CatalogRecord, StoreError> {
        let mut inner = self.inner.lock();
        let staged = inner.pending.iter().any(|op| {
            matches!(op, PendingOp::Insert(r)
                if r.owner == owner && r.catalog_type == catalog_type && r.name == name)
        });
        if staged || inner.exists(owner, catalog_type, name)? {
            return Err(StoreError::Duplicate(name.to_string()));
        }
        let record = CatalogRecord::new(owner, catalog_type, name, format);
        inner.pending.push(PendingOp::Insert(record.clone()));
        Ok(record)
    }

    async fn get(
        &self,
        owner: &str,
        catalog_type: CatalogType,
        name: &str,
    ) -> Result<Option<CatalogRecord>, StoreError> {
        let inner = self.inner.lock();
        let raw = inner
            .conn
            .query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM catalogs \
                     WHERE owner = ?1 AND catalog_type = ?2 AND name = ?3"
                ),
                params![owner, catalog_type.as_str(), name],
                record_from_row,
            )
            .optional()
            .context("Failed to query catalog record")?;
        match raw {
            Some(raw) => Ok(Some(parse_record(raw)?)),
            None => Ok(None),
        }
    }

    async fn list(
        &self,
        owner: &str,
        catalog_type: CatalogType,
    ) -> Result<Vec<CatalogRecord>, StoreError> {
        let inner = self.inner.lock();
        let mut stmt = inner
            .conn
            .prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM catalogs \
                 WHERE owner = ?1 AND catalog_type = ?2 ORDER BY name"
            ))
            .context("Failed to prepare catalog listing")?;
        let rows = stmt
            .query_map(params![owner, catalog_type.as_str()], record_from_row)
            .context("Failed to list catalog records")?;
        let mut records = Vec::new();
        for raw in rows {
            records.push(parse_record(raw.context("Failed to read catalog row")?)?);
        }
        Ok(records)
    }

    async fn update_fields(
        &self,
        record: &CatalogRecord,
        format: Option<CatalogFormat>,
    ) -> Result<CatalogRecord, StoreError> {
        let mut updated = record.clone();
        updated.created = Utc::now();
        if let Some(format) = format {
            updated.format = format;
        }
        let mut inner = self.inner.lock();
        inner.pending.push(PendingOp::Update(updated.clone()));
        Ok(updated)
    }

    async fn delete(&self, record: &CatalogRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.pending.push(PendingOp::Delete(record.id.clone()));
        Ok(())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        self.inner.lock().apply_pending()
    }

    async fn commit(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.apply_pending()?;
        if !inner.conn.is_autocommit() {
            inner
                .conn
                .execute_batch("COMMIT")
                .context("Failed to commit catalog transaction")?;
        }
        Ok(())
    }

    async fn discard(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.pending.clear();
        if !inner.conn.is_autocommit() {
            inner
                .conn
                .execute_batch("ROLLBACK")
                .context("Failed to roll back catalog transaction")?;
        }
        Ok(())
    }
}
