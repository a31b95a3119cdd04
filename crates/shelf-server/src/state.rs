use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use shelf::blob::FsBlobStore;
use shelf::db::SqliteMetadataStore;
use shelf::intent::IntentJournal;
use shelf::services::CatalogService;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root storage directory: holds the metadata database, the blob tree
    /// and the intent journal.
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".shelf/storage"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Clone)]
pub struct AppState {
    pub catalogs: Arc<CatalogService>,
    pub config: ServerConfig,
}

impl AppState {
    /// Configuration from defaults, an optional `shelf.toml`, and
    /// `SHELF_`-prefixed environment variables (`__` separator).
    pub async fn from_env() -> Result<Self> {
        let config: ServerConfig = Figment::new()
            .merge(Serialized::defaults(ServerConfig::default()))
            .merge(Toml::file("shelf.toml"))
            .merge(Env::prefixed("SHELF_").split("__"))
            .extract()?;
        Self::from_config(config).await
    }

    pub async fn from_config(config: ServerConfig) -> Result<Self> {
        let root = config.storage.dir.clone();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create storage directory {}", root.display()))?;

        let meta = Arc::new(SqliteMetadataStore::open(root.join("catalogs.db"))?);
        let blobs = Arc::new(FsBlobStore::new(root.clone()));
        let intents = IntentJournal::new(root.join("intents"));
        let catalogs = Arc::new(CatalogService::new(meta, blobs, intents));

        let report = catalogs
            .reconcile()
            .await
            .context("Startup reconciliation sweep failed")?;
        if report.examined > 0 {
            tracing::info!(
                examined = report.examined,
                records_removed = report.records_removed,
                blobs_removed = report.blobs_removed,
                "Reconciled pending catalog intents"
            );
        }

        Ok(Self { catalogs, config })
    }
}
