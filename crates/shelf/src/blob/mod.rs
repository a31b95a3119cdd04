pub mod fs;

use crate::services::CatalogType;
use std::io;

pub use fs::FsBlobStore;

/// Content area holding one blob per catalog, addressed by
/// `(catalog_type, owner, name)`. A blob has no identity beyond that key; it
/// is overwritten in place on update.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Write the blob in full, removing any previous content first. On
    /// failure the presence of the prior content is undefined.
    async fn write(
        &self,
        catalog_type: CatalogType,
        owner: &str,
        name: &str,
        data: &[u8],
    ) -> io::Result<()>;

    /// The blob's bytes, or `None` when absent.
    async fn read(
        &self,
        catalog_type: CatalogType,
        owner: &str,
        name: &str,
    ) -> io::Result<Option<Vec<u8>>>;

    async fn exists(&self, catalog_type: CatalogType, owner: &str, name: &str)
        -> io::Result<bool>;

    /// Remove the blob. A no-op when absent.
    async fn delete(&self, catalog_type: CatalogType, owner: &str, name: &str) -> io::Result<()>;
}
