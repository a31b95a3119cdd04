//! Test utilities for the shelf crate.
//!
//! Reusable test doubles for unit and integration testing, including an
//! in-memory [`BlobStore`] with switchable write failures for exercising
//! the coordinator's failure paths.

use crate::blob::BlobStore;
use crate::services::CatalogType;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

type BlobKey = (CatalogType, String, String);

/// In-memory blob store.
///
/// With `fail_writes` set, `write` removes any existing blob and then fails,
/// mirroring the filesystem store's remove-then-write behavior on a failed
/// write.
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<BlobKey, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

fn key(catalog_type: CatalogType, owner: &str, name: &str) -> BlobKey {
    (catalog_type, owner.to_string(), name.to_string())
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn write(
        &self,
        catalog_type: CatalogType,
        owner: &str,
        name: &str,
        data: &[u8],
    ) -> io::Result<()> {
        let mut blobs = self.blobs.lock().unwrap();
        blobs.remove(&key(catalog_type, owner, name));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::other("injected write failure"));
        }
        blobs.insert(key(catalog_type, owner, name), data.to_vec());
        Ok(())
    }

    async fn read(
        &self,
        catalog_type: CatalogType,
        owner: &str,
        name: &str,
    ) -> io::Result<Option<Vec<u8>>> {
        Ok(self
            .blobs
            .lock()
            .unwrap()
            .get(&key(catalog_type, owner, name))
            .cloned())
    }

    async fn exists(
        &self,
        catalog_type: CatalogType,
        owner: &str,
        name: &str,
    ) -> io::Result<bool> {
        Ok(self
            .blobs
            .lock()
            .unwrap()
            .contains_key(&key(catalog_type, owner, name)))
    }

    async fn delete(&self, catalog_type: CatalogType, owner: &str, name: &str) -> io::Result<()> {
        self.blobs.lock().unwrap().remove(&key(catalog_type, owner, name));
        Ok(())
    }
}
