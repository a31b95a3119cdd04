//! Write-ahead intent journal for blob mutations.
//!
//! The coordinator records an intent entry before touching the blob store
//! and clears it after the metadata transaction commits. Entries that
//! survive a crash mark the only keys where the two stores can have
//! diverged; the reconciliation sweep inspects exactly those keys.

use crate::services::CatalogType;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// One in-flight blob mutation, keyed by `(owner, catalog_type, name)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub owner: String,
    pub catalog_type: CatalogType,
    pub name: String,
    pub recorded: DateTime<Utc>,
}

/// Directory of JSON intent entries, one file per in-flight key.
pub struct IntentJournal {
    dir: PathBuf,
}

impl IntentJournal {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // Owner and name are restricted to [a-zA-Z0-9.], so "__" cannot occur
    // inside either and the entry name is collision-free per key.
    fn entry_path(&self, owner: &str, catalog_type: CatalogType, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}__{}__{}.json", owner, catalog_type.as_str(), name))
    }

    /// Durably record an intent entry for the key. Overwrites any previous
    /// entry for the same key.
    pub async fn record(&self, owner: &str, catalog_type: CatalogType, name: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .context("Failed to create intent journal directory")?;
        let intent = Intent {
            owner: owner.to_string(),
            catalog_type,
            name: name.to_string(),
            recorded: Utc::now(),
        };
        let bytes = serde_json::to_vec(&intent).context("Failed to encode intent entry")?;

        let path = self.entry_path(owner, catalog_type, name);
        let mut file = fs::File::create(&path)
            .await
            .with_context(|| format!("Failed to create intent entry {}", path.display()))?;
        file.write_all(&bytes)
            .await
            .context("Failed to write intent entry")?;
        file.sync_all()
            .await
            .context("Failed to sync intent entry")?;
        Ok(())
    }

    /// Remove the intent entry for the key. A no-op when absent.
    pub async fn clear(&self, owner: &str, catalog_type: CatalogType, name: &str) -> Result<()> {
        let path = self.entry_path(owner, catalog_type, name);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(anyhow::Error::new(e)
                    .context(format!("Failed to clear intent entry {}", path.display())))
            },
        }
    }

    /// All pending intent entries. Unreadable entries are skipped with a
    /// warning rather than failing the sweep.
    pub async fn pending(&self) -> Result<Vec<Intent>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(anyhow::Error::new(e).context("Failed to read intent journal")),
        };

        let mut intents = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .context("Failed to read intent journal entry")?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path)
                .await
                .with_context(|| format!("Failed to read intent entry {}", path.display()))?;
            match serde_json::from_slice::<Intent>(&bytes) {
                Ok(intent) => intents.push(intent),
                Err(e) => {
                    tracing::warn!(entry = %path.display(), error = %e, "Skipping unreadable intent entry");
                },
            }
        }
        Ok(intents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn journal() -> (tempfile::TempDir, IntentJournal) {
        let dir = tempfile::tempdir().unwrap();
        let journal = IntentJournal::new(dir.path().join("intents"));
        (dir, journal)
    }

    #[tokio::test]
    async fn record_then_pending_then_clear() {
        let (_dir, journal) = journal();
        journal
            .record("alice", CatalogType::Replica, "r1")
            .await
            .unwrap();

        let pending = journal.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].owner, "alice");
        assert_eq!(pending[0].catalog_type, CatalogType::Replica);
        assert_eq!(pending[0].name, "r1");

        journal
            .clear("alice", CatalogType::Replica, "r1")
            .await
            .unwrap();
        assert!(journal.pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pending_on_missing_directory_is_empty() {
        let (_dir, journal) = journal();
        assert!(journal.pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let (_dir, journal) = journal();
        journal
            .clear("alice", CatalogType::Site, "never-recorded")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn record_overwrites_same_key() {
        let (_dir, journal) = journal();
        journal
            .record("alice", CatalogType::Site, "s1")
            .await
            .unwrap();
        journal
            .record("alice", CatalogType::Site, "s1")
            .await
            .unwrap();
        assert_eq!(journal.pending().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unreadable_entry_is_skipped() {
        let (_dir, journal) = journal();
        journal
            .record("alice", CatalogType::Site, "s1")
            .await
            .unwrap();
        tokio::fs::write(journal.dir().join("garbage.json"), b"not json")
            .await
            .unwrap();

        let pending = journal.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
    }
}
