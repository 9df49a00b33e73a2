//! On-disk artifact store.
//!
//! Every successful render becomes one [`Artifact`]: a PDF file named by a
//! fresh UUID plus a JSON metadata sidecar, both under the store root. Writers
//! never touch a visible path in place — bytes land in a hidden `.incoming/`
//! directory and are promoted with an atomic rename, so a concurrent reader
//! either sees the complete file or nothing. An in-memory index
//! ([`dashmap::DashMap`]) serves lookups without touching the filesystem;
//! [`ArtifactStore::open`] rebuilds it by rescanning the root directory.
//!
//! Lifecycle per artifact: pending (bytes in `.incoming/`, never visible) →
//! available (renamed into the root) → evicted (removed by the retention
//! sweep or an explicit delete; never resurrected).

pub mod sweeper;

use crate::types::{ArtifactId, RequestId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error as ThisError;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Hidden staging directory inside the store root.
const INCOMING_DIR: &str = ".incoming";

/// Faults at the filesystem boundary, translated to the service error
/// taxonomy before reaching a handler.
#[derive(Debug, ThisError)]
pub enum StorageError {
    #[error("artifact not found")]
    NotFound,

    /// Guard against promoting an empty file; the renderer already treats
    /// zero-content output as a failure, this is the store's own invariant
    #[error("refusing to persist empty artifact")]
    EmptyArtifact,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Metadata record for one generated document. Serialized as the artifact's
/// JSON sidecar (`{id}.json`), which is how template and filename survive a
/// restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    /// The generation request that produced this artifact
    pub request_id: RequestId,
    pub template: String,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
    #[serde(skip)]
    path: PathBuf,
}

impl Artifact {
    /// On-disk location. Internal: response payloads must never carry paths.
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

pub struct ArtifactStore {
    root: PathBuf,
    incoming: PathBuf,
    index: DashMap<ArtifactId, Artifact>,
}

impl ArtifactStore {
    /// Open (or create) the store rooted at `root` and rebuild the index
    /// from whatever survived on disk.
    ///
    /// Leftovers in `.incoming/` are writes that never reached promotion
    /// (a crash mid-render); they were never visible and are discarded.
    pub async fn open(root: &Path) -> StorageResult<Self> {
        let root = root.to_path_buf();
        let incoming = root.join(INCOMING_DIR);
        fs::create_dir_all(&incoming).await?;

        let store = Self {
            root,
            incoming,
            index: DashMap::new(),
        };
        store.discard_incoming().await?;
        let recovered = store.rescan().await?;

        if recovered > 0 {
            tracing::info!("Artifact store opened at {:?}, re-indexed {} artifact(s)", store.root, recovered);
        } else {
            tracing::info!("Artifact store opened at {:?}", store.root);
        }
        Ok(store)
    }

    async fn discard_incoming(&self) -> StorageResult<()> {
        let mut entries = fs::read_dir(&self.incoming).await?;
        while let Some(entry) = entries.next_entry().await? {
            tracing::warn!("Discarding unpromoted artifact {:?}", entry.file_name());
            let _ = fs::remove_file(entry.path()).await;
        }
        Ok(())
    }

    /// Index every `{uuid}.pdf` under the root, preferring the JSON sidecar
    /// for metadata and falling back to file attributes when it is missing.
    /// Sidecars without a PDF (crash between the two promotion renames) are
    /// removed.
    async fn rescan(&self) -> StorageResult<usize> {
        let mut recovered = 0;
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("pdf") {
                continue;
            }
            let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<Uuid>().ok())
            else {
                continue;
            };

            let artifact = match self.read_sidecar(id).await {
                Some(mut artifact) => {
                    artifact.path = path.clone();
                    artifact
                }
                None => {
                    // Sidecar lost; reconstruct what the filesystem still knows
                    let meta = fs::metadata(&path).await?;
                    let created_at = meta.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now());
                    Artifact {
                        id,
                        request_id: Uuid::nil(),
                        template: "unknown".to_string(),
                        filename: format!("{id}.pdf"),
                        created_at,
                        size_bytes: meta.len(),
                        path: path.clone(),
                    }
                }
            };

            self.index.insert(id, artifact);
            recovered += 1;
        }

        // Drop orphaned sidecars
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let orphaned = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<Uuid>().ok())
                .is_some_and(|id| !self.index.contains_key(&id));
            if orphaned {
                tracing::warn!("Removing orphaned metadata sidecar {:?}", path);
                let _ = fs::remove_file(&path).await;
            }
        }

        Ok(recovered)
    }

    async fn read_sidecar(&self, id: ArtifactId) -> Option<Artifact> {
        let bytes = fs::read(self.root.join(format!("{id}.json"))).await.ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Persist rendered bytes as a new artifact.
    ///
    /// The PDF is written to `.incoming/` and fsynced, then the metadata
    /// sidecar and finally the PDF itself are renamed into the root. The PDF
    /// rename is the promotion point: until it happens nothing is
    /// retrievable, after it the artifact is complete. The write step (only)
    /// is retried once on failure; rendering is never re-run here.
    pub async fn store(
        &self,
        request_id: RequestId,
        template: &str,
        filename: String,
        bytes: &[u8],
    ) -> StorageResult<Artifact> {
        if bytes.is_empty() {
            return Err(StorageError::EmptyArtifact);
        }

        let id: ArtifactId = Uuid::new_v4();
        let staged_pdf = self.incoming.join(format!("{id}.pdf"));
        let staged_meta = self.incoming.join(format!("{id}.json"));

        let artifact = Artifact {
            id,
            request_id,
            template: template.to_string(),
            filename,
            created_at: Utc::now(),
            size_bytes: bytes.len() as u64,
            path: self.root.join(format!("{id}.pdf")),
        };
        let meta_bytes = serde_json::to_vec(&artifact).map_err(std::io::Error::other)?;

        if let Err(first) = write_file(&staged_pdf, bytes).await {
            tracing::warn!(artifact_id = %id, error = %first, "Artifact write failed, retrying once");
            let _ = fs::remove_file(&staged_pdf).await;
            write_file(&staged_pdf, bytes).await?;
        }
        write_file(&staged_meta, &meta_bytes).await?;

        // Sidecar first: a crash here leaves an orphaned .json that the next
        // rescan removes. The pdf rename is what makes the artifact visible.
        fs::rename(&staged_meta, self.root.join(format!("{id}.json"))).await?;
        fs::rename(&staged_pdf, &artifact.path).await?;

        self.index.insert(id, artifact.clone());

        tracing::debug!(
            artifact_id = %id,
            request_id = %request_id,
            size_bytes = artifact.size_bytes,
            "Artifact promoted"
        );
        Ok(artifact)
    }

    /// Look up an artifact's metadata by id.
    pub fn get(&self, id: &ArtifactId) -> StorageResult<Artifact> {
        self.index.get(id).map(|entry| entry.clone()).ok_or(StorageError::NotFound)
    }

    /// Retrieve an artifact's metadata and full content.
    pub async fn read(&self, id: &ArtifactId) -> StorageResult<(Artifact, Vec<u8>)> {
        let artifact = self.get(id)?;
        match fs::read(artifact.path()).await {
            Ok(bytes) => Ok((artifact, bytes)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                // File vanished underneath the index (external deletion)
                self.index.remove(id);
                Err(StorageError::NotFound)
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Remove an artifact and its sidecar. Errors with `NotFound` if the id
    /// is unknown or already evicted.
    pub async fn delete(&self, id: &ArtifactId) -> StorageResult<()> {
        let (_, artifact) = self.index.remove(id).ok_or(StorageError::NotFound)?;
        let _ = fs::remove_file(self.root.join(format!("{id}.json"))).await;
        fs::remove_file(artifact.path()).await?;
        Ok(())
    }

    /// All artifacts, newest first.
    pub fn list(&self) -> Vec<Artifact> {
        let mut artifacts: Vec<Artifact> = self.index.iter().map(|entry| entry.clone()).collect();
        artifacts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        artifacts
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// One eviction pass: remove every artifact older than `retention`.
    ///
    /// `grace` is a floor — nothing younger than it is ever touched, so a
    /// retrieval that resolved an id moments ago cannot lose the file
    /// mid-read. Returns the number of artifacts evicted.
    pub async fn evict_expired(&self, retention: Duration, grace: Duration) -> usize {
        let horizon = retention.max(grace);
        let Ok(horizon) = chrono::Duration::from_std(horizon) else {
            return 0;
        };
        let cutoff = Utc::now() - horizon;

        let expired: Vec<ArtifactId> = self
            .index
            .iter()
            .filter(|entry| entry.created_at < cutoff)
            .map(|entry| entry.id)
            .collect();

        let mut evicted = 0;
        for id in expired {
            match self.delete(&id).await {
                Ok(()) => {
                    tracing::debug!(artifact_id = %id, "Artifact evicted");
                    evicted += 1;
                }
                // Raced with an explicit delete
                Err(StorageError::NotFound) => {}
                Err(error) => {
                    tracing::error!(artifact_id = %id, error = %error, "Failed to evict artifact");
                }
            }
        }
        evicted
    }

    /// Backdate an artifact's creation time (test hook for retention tests).
    #[cfg(test)]
    pub(crate) fn backdate(&self, id: &ArtifactId, created_at: DateTime<Utc>) {
        if let Some(mut entry) = self.index.get_mut(id) {
            entry.created_at = created_at;
        }
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}
