use super::BlobStore;
use crate::services::CatalogType;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Filesystem [`BlobStore`] rooted at the configured storage directory.
///
/// Blobs live at `<root>/userdata/{owner}/catalogs/{type}/{name}`, one file
/// per catalog.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Derived location for a blob. Creates the containing directory
    /// hierarchy when absent; creation is idempotent.
    pub async fn path_for(
        &self,
        catalog_type: CatalogType,
        owner: &str,
        name: &str,
    ) -> io::Result<PathBuf> {
        let dir = self
            .root
            .join("userdata")
            .join(owner)
            .join("catalogs")
            .join(catalog_type.as_str());
        fs::create_dir_all(&dir).await?;
        Ok(dir.join(name))
    }
}

async fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[async_trait::async_trait]
impl BlobStore for FsBlobStore {
    async fn write(
        &self,
        catalog_type: CatalogType,
        owner: &str,
        name: &str,
        data: &[u8],
    ) -> io::Result<()> {
        let path = self.path_for(catalog_type, owner, name).await?;
        remove_if_present(&path).await?;
        fs::write(&path, data).await
    }

    async fn read(
        &self,
        catalog_type: CatalogType,
        owner: &str,
        name: &str,
    ) -> io::Result<Option<Vec<u8>>> {
        let path = self.path_for(catalog_type, owner, name).await?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn exists(
        &self,
        catalog_type: CatalogType,
        owner: &str,
        name: &str,
    ) -> io::Result<bool> {
        let path = self.path_for(catalog_type, owner, name).await?;
        fs::try_exists(&path).await
    }

    async fn delete(&self, catalog_type: CatalogType, owner: &str, name: &str) -> io::Result<()> {
        let path = self.path_for(catalog_type, owner, name).await?;
        remove_if_present(&path).await
    }
}
