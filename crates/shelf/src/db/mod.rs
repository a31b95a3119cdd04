pub mod sqlite;

use crate::services::{CatalogFormat, CatalogRecord, CatalogType};

pub use sqlite::SqliteMetadataStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate catalog name: {0}")]
    Duplicate(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Durable table of catalog records, keyed by `(owner, catalog_type, name)`.
///
/// Mutations are staged into a pending unit of work: `flush` makes them
/// queryable within that unit of work without making them durable, `commit`
/// persists everything staged since the last commit, and `discard` drops the
/// unit of work. `get` and `list` observe committed rows plus anything
/// already flushed.
#[async_trait::async_trait]
pub trait MetadataStore: Send + Sync {
    /// Stage a new record. Fails with [`StoreError::Duplicate`] when
    /// `(owner, catalog_type, name)` already exists, committed, flushed, or
    /// staged.
    async fn create(
        &self,
        owner: &str,
        catalog_type: CatalogType,
        name: &str,
        format: CatalogFormat,
    ) -> Result<CatalogRecord, StoreError>;

    async fn get(
        &self,
        owner: &str,
        catalog_type: CatalogType,
        name: &str,
    ) -> Result<Option<CatalogRecord>, StoreError>;

    /// All records of one type for one owner. Order is stable within a call.
    async fn list(
        &self,
        owner: &str,
        catalog_type: CatalogType,
    ) -> Result<Vec<CatalogRecord>, StoreError>;

    /// Stage a field update: `created` is replaced with now, `format` is
    /// replaced when supplied. Validity of the format for the record's type
    /// is the caller's concern.
    async fn update_fields(
        &self,
        record: &CatalogRecord,
        format: Option<CatalogFormat>,
    ) -> Result<CatalogRecord, StoreError>;

    /// Stage removal of a record.
    async fn delete(&self, record: &CatalogRecord) -> Result<(), StoreError>;

    /// Apply staged mutations inside the open transaction.
    async fn flush(&self) -> Result<(), StoreError>;

    /// Flush anything still staged, then durably commit. Irreversible.
    async fn commit(&self) -> Result<(), StoreError>;

    /// Drop staged mutations and roll back the open transaction.
    async fn discard(&self) -> Result<(), StoreError>;
}
