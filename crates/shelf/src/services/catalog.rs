use super::{
    validate_format, validate_name, validate_owner, CatalogDescriptor, CatalogFormat,
    CatalogRecord, CatalogType, ServiceError,
};
use crate::blob::BlobStore;
use crate::db::MetadataStore;
use crate::intent::IntentJournal;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Outcome of one reconciliation sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileReport {
    pub examined: usize,
    pub records_removed: usize,
    pub blobs_removed: usize,
}

enum IntentOutcome {
    Consistent,
    RecordRemoved,
    BlobRemoved,
}

/// Coordinates catalog mutations across the metadata store and the blob
/// store.
///
/// Every mutation follows the same ordering contract: validate, stage the
/// metadata change, flush it into the open transaction, durably record an
/// intent entry, mutate the blob store, commit, clear the intent. The
/// metadata change is always staged before the blob mutation and committed
/// after it, so a crash leaves at worst an orphan blob or a journaled
/// divergence the sweep resolves, never a silently dangling record.
pub struct CatalogService {
    meta: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    intents: IntentJournal,
    // One operation at a time: the metadata store's pending unit of work
    // must not interleave between requests.
    op_lock: Mutex<()>,
}

impl CatalogService {
    pub fn new(
        meta: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        intents: IntentJournal,
    ) -> Self {
        Self {
            meta,
            blobs,
            intents,
            op_lock: Mutex::new(()),
        }
    }

    /// Register a new catalog: metadata record plus blob, created together.
    pub async fn create(
        &self,
        owner: &str,
        catalog_type: CatalogType,
        name: &str,
        format: CatalogFormat,
        data: &[u8],
    ) -> Result<CatalogRecord, ServiceError> {
        validate_owner(owner)?;
        validate_name(name)?;
        validate_format(catalog_type, format)?;

        let _guard = self.op_lock.lock().await;

        let record = self.meta.create(owner, catalog_type, name, format).await?;
        if let Err(e) = self.meta.flush().await {
            let _ = self.meta.discard().await;
            return Err(e.into());
        }
        if let Err(e) = self.intents.record(owner, catalog_type, name).await {
            let _ = self.meta.discard().await;
            return Err(ServiceError::Internal(e));
        }
        if let Err(e) = self.blobs.write(catalog_type, owner, name, data).await {
            self.abort_after_blob_failure(owner, catalog_type, name).await;
            return Err(ServiceError::Storage(e));
        }
        if let Err(e) = self.meta.commit().await {
            // The blob landed but the record did not; the surviving journal
            // entry lets the sweep remove the orphan blob.
            let _ = self.meta.discard().await;
            return Err(e.into());
        }
        self.clear_intent(owner, catalog_type, name).await;
        Ok(record)
    }

    /// Update an existing catalog. The timestamp is always refreshed; the
    /// format is replaced only when supplied, the blob only when a payload
    /// is supplied.
    pub async fn update(
        &self,
        owner: &str,
        catalog_type: CatalogType,
        name: &str,
        format: Option<CatalogFormat>,
        data: Option<&[u8]>,
    ) -> Result<CatalogRecord, ServiceError> {
        validate_owner(owner)?;

        let _guard = self.op_lock.lock().await;

        let record = self
            .meta
            .get(owner, catalog_type, name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("No such catalog: {}", name)))?;
        if let Some(format) = format {
            // The catalog type is fixed at creation, so the new format must
            // fit the existing record's type.
            validate_format(record.catalog_type, format)?;
        }

        let updated = self.meta.update_fields(&record, format).await?;
        if let Err(e) = self.meta.flush().await {
            let _ = self.meta.discard().await;
            return Err(e.into());
        }
        if let Some(data) = data {
            if let Err(e) = self.intents.record(owner, catalog_type, name).await {
                let _ = self.meta.discard().await;
                return Err(ServiceError::Internal(e));
            }
            if let Err(e) = self.blobs.write(catalog_type, owner, name, data).await {
                self.abort_after_blob_failure(owner, catalog_type, name).await;
                return Err(ServiceError::Storage(e));
            }
        }
        if let Err(e) = self.meta.commit().await {
            let _ = self.meta.discard().await;
            return Err(e.into());
        }
        if data.is_some() {
            self.clear_intent(owner, catalog_type, name).await;
        }
        Ok(updated)
    }

    /// Delete a catalog: record and blob removed in the same operation. The
    /// staged record removal precedes the irreversible file removal, so a
    /// crash leaves an orphan file rather than a dangling record.
    pub async fn delete(
        &self,
        owner: &str,
        catalog_type: CatalogType,
        name: &str,
    ) -> Result<(), ServiceError> {
        validate_owner(owner)?;

        let _guard = self.op_lock.lock().await;

        let record = self
            .meta
            .get(owner, catalog_type, name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("No such catalog: {}", name)))?;

        self.meta.delete(&record).await?;
        if let Err(e) = self.meta.flush().await {
            let _ = self.meta.discard().await;
            return Err(e.into());
        }
        if let Err(e) = self.intents.record(owner, catalog_type, name).await {
            let _ = self.meta.discard().await;
            return Err(ServiceError::Internal(e));
        }
        if let Err(e) = self.blobs.delete(catalog_type, owner, name).await {
            self.abort_after_blob_failure(owner, catalog_type, name).await;
            return Err(ServiceError::Storage(e));
        }
        if let Err(e) = self.meta.commit().await {
            // The blob is already gone; the journal entry lets the sweep
            // retire the now-dangling record.
            let _ = self.meta.discard().await;
            return Err(e.into());
        }
        self.clear_intent(owner, catalog_type, name).await;
        Ok(())
    }

    /// The metadata record for one catalog.
    pub async fn get(
        &self,
        owner: &str,
        catalog_type: CatalogType,
        name: &str,
    ) -> Result<CatalogRecord, ServiceError> {
        validate_owner(owner)?;
        let _guard = self.op_lock.lock().await;
        self.meta
            .get(owner, catalog_type, name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("No such catalog: {}", name)))
    }

    /// The blob bytes for one catalog.
    pub async fn fetch(
        &self,
        owner: &str,
        catalog_type: CatalogType,
        name: &str,
    ) -> Result<Vec<u8>, ServiceError> {
        validate_owner(owner)?;
        let _guard = self.op_lock.lock().await;
        self.blobs
            .read(catalog_type, owner, name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("No such catalog: {}", name)))
    }

    /// The caller's catalogs of one type, projected to external
    /// descriptors.
    pub async fn list(
        &self,
        owner: &str,
        catalog_type: CatalogType,
    ) -> Result<Vec<CatalogDescriptor>, ServiceError> {
        validate_owner(owner)?;
        let _guard = self.op_lock.lock().await;
        let records = self.meta.list(owner, catalog_type).await?;
        Ok(records.iter().map(CatalogDescriptor::from_record).collect())
    }

    /// Reconciliation sweep over pending intent entries. Run at startup to
    /// restore the steady-state invariant after a crash.
    pub async fn reconcile(&self) -> Result<ReconcileReport, ServiceError> {
        let _guard = self.op_lock.lock().await;

        let pending = self.intents.pending().await?;
        let mut report = ReconcileReport::default();
        for intent in pending {
            report.examined += 1;
            let outcome = self
                .resolve_intent(&intent.owner, intent.catalog_type, &intent.name)
                .await?;
            match outcome {
                IntentOutcome::Consistent => {},
                IntentOutcome::RecordRemoved => {
                    report.records_removed += 1;
                    tracing::info!(
                        owner = %intent.owner,
                        catalog_type = %intent.catalog_type,
                        name = %intent.name,
                        "Removed dangling catalog record"
                    );
                },
                IntentOutcome::BlobRemoved => {
                    report.blobs_removed += 1;
                    tracing::info!(
                        owner = %intent.owner,
                        catalog_type = %intent.catalog_type,
                        name = %intent.name,
                        "Removed orphan catalog blob"
                    );
                },
            }
        }
        Ok(report)
    }

    /// Resolve one journaled key deterministically: record and blob both
    /// present (or both absent) is consistent; a record without a blob is
    /// removed; a blob without a record is removed.
    async fn resolve_intent(
        &self,
        owner: &str,
        catalog_type: CatalogType,
        name: &str,
    ) -> Result<IntentOutcome, ServiceError> {
        let record = self.meta.get(owner, catalog_type, name).await?;
        let blob_present = self.blobs.exists(catalog_type, owner, name).await?;
        match (record, blob_present) {
            (Some(_), true) | (None, false) => {
                self.intents.clear(owner, catalog_type, name).await?;
                Ok(IntentOutcome::Consistent)
            },
            (Some(record), false) => {
                self.meta.delete(&record).await?;
                if let Err(e) = self.meta.flush().await {
                    let _ = self.meta.discard().await;
                    return Err(e.into());
                }
                if let Err(e) = self.meta.commit().await {
                    let _ = self.meta.discard().await;
                    return Err(e.into());
                }
                self.intents.clear(owner, catalog_type, name).await?;
                Ok(IntentOutcome::RecordRemoved)
            },
            (None, true) => {
                self.blobs.delete(catalog_type, owner, name).await?;
                self.intents.clear(owner, catalog_type, name).await?;
                Ok(IntentOutcome::BlobRemoved)
            },
        }
    }

    async fn abort_after_blob_failure(&self, owner: &str, catalog_type: CatalogType, name: &str) {
        let _ = self.meta.discard().await;
        if let Err(e) = self.resolve_intent(owner, catalog_type, name).await {
            tracing::warn!(
                owner,
                catalog_type = %catalog_type,
                name,
                error = %e,
                "Failed to resolve intent after blob mutation failure"
            );
        }
    }

    async fn clear_intent(&self, owner: &str, catalog_type: CatalogType, name: &str) {
        if let Err(e) = self.intents.clear(owner, catalog_type, name).await {
            tracing::warn!(
                owner,
                catalog_type = %catalog_type,
                name,
                error = %e,
                "Failed to clear intent entry; the sweep will retire it"
            );
        }
    }
}
