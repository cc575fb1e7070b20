//! Artifact Store
//!
//! Generated PDFs waiting for a single download. Every generation gets its
//! own id, so concurrent requests never share a file, and `take` claims a
//! file atomically before reading it, so each artifact is served at most once.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::retention::{cutoff, remove_older_than};
use super::StorageError;

// ============================================================================
// Artifact Kinds
// ============================================================================

/// What produced an artifact, which decides its file name and download name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// A filled-in template from `/generate-pdf`
    Processed,
    /// A page built from free text by `/generate-template`
    Template,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 2] = [ArtifactKind::Processed, ArtifactKind::Template];

    /// File name prefix on disk
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Template => "template",
        }
    }

    /// File name offered to the downloading client
    pub fn download_name(self) -> &'static str {
        match self {
            Self::Processed => "processed.pdf",
            Self::Template => "template.pdf",
        }
    }

    /// Route serving this kind
    pub fn download_route(self) -> &'static str {
        match self {
            Self::Processed => "/download-pdf",
            Self::Template => "/download-template",
        }
    }

    fn file_name(self, id: Uuid) -> String {
        format!("{}-{}.pdf", self.prefix(), id)
    }

    /// Whether `name` is a staged artifact of this kind
    fn matches(self, name: &str) -> bool {
        name.strip_prefix(self.prefix())
            .and_then(|rest| rest.strip_prefix('-'))
            .and_then(|rest| rest.strip_suffix(".pdf"))
            .is_some_and(|id| Uuid::try_parse(id).is_ok())
    }

    /// Whether `name` is a write or claim file left behind for this kind
    fn matches_scratch(self, name: &str) -> bool {
        let Some((file, suffix)) = name
            .strip_prefix('.')
            .and_then(|rest| rest.split_once(".pdf."))
        else {
            return false;
        };

        let scratch = suffix == "partial"
            || suffix
                .strip_prefix("claim-")
                .is_some_and(|token| Uuid::try_parse(token).is_ok());
        scratch && self.matches(&format!("{}.pdf", file))
    }
}

// ============================================================================
// Artifact Storage Trait
// ============================================================================

/// Trait for artifact storage backends
#[async_trait::async_trait]
pub trait ArtifactStorage: Send + Sync {
    /// Stage an artifact under `id`
    async fn put(&self, kind: ArtifactKind, id: Uuid, data: &[u8]) -> Result<(), StorageError>;

    /// Remove and return an artifact. Fails with `ArtifactNotFound` if it
    /// was never staged or has already been taken.
    async fn take(&self, kind: ArtifactKind, id: Uuid) -> Result<Vec<u8>, StorageError>;

    /// Delete artifacts, and any scratch files, last modified before `cutoff`
    async fn sweep(&self, cutoff: DateTime<Utc>) -> Result<usize, StorageError>;
}

// ============================================================================
// Artifact Store (Main Implementation)
// ============================================================================

/// Artifact store with a pluggable backend
#[derive(Clone)]
pub struct ArtifactStore {
    backend: Arc<dyn ArtifactStorage>,
}

impl ArtifactStore {
    /// Create with local filesystem storage
    pub fn with_local_storage(base_path: PathBuf) -> Self {
        Self {
            backend: Arc::new(LocalArtifactStorage::new(base_path)),
        }
    }

    /// Stage a new artifact and return its id
    pub async fn store(&self, kind: ArtifactKind, data: &[u8]) -> Result<Uuid, StorageError> {
        let id = Uuid::new_v4();
        self.backend.put(kind, id, data).await?;

        tracing::debug!(
            artifact_id = %id,
            kind = kind.prefix(),
            size = data.len(),
            "Artifact staged"
        );

        Ok(id)
    }

    /// Take an artifact for download. It is gone afterwards.
    pub async fn take(&self, kind: ArtifactKind, id: Uuid) -> Result<Vec<u8>, StorageError> {
        let data = self.backend.take(kind, id).await?;

        tracing::debug!(
            artifact_id = %id,
            kind = kind.prefix(),
            size = data.len(),
            "Artifact served and removed"
        );

        Ok(data)
    }

    /// Remove artifacts nobody downloaded within `max_age`
    pub async fn sweep(&self, max_age: chrono::Duration) -> Result<usize, StorageError> {
        match cutoff(max_age) {
            Some(cutoff) => self.backend.sweep(cutoff).await,
            None => Ok(0),
        }
    }
}

// ============================================================================
// Local Filesystem Storage
// ============================================================================

/// Local filesystem artifact storage
struct LocalArtifactStorage {
    base_path: PathBuf,
}

impl LocalArtifactStorage {
    fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn artifact_path(&self, kind: ArtifactKind, id: Uuid) -> PathBuf {
        self.base_path.join(kind.file_name(id))
    }

    /// Scratch path used while writing, never matched by `take` or `sweep`
    fn partial_path(&self, kind: ArtifactKind, id: Uuid) -> PathBuf {
        self.base_path
            .join(format!(".{}.partial", kind.file_name(id)))
    }

    /// Private path a claimed artifact is moved to before reading
    fn claim_path(&self, kind: ArtifactKind, id: Uuid) -> PathBuf {
        self.base_path
            .join(format!(".{}.claim-{}", kind.file_name(id), Uuid::new_v4().simple()))
    }
}

#[async_trait::async_trait]
impl ArtifactStorage for LocalArtifactStorage {
    async fn put(&self, kind: ArtifactKind, id: Uuid, data: &[u8]) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.base_path).await?;

        // Write then rename so a download never observes a half-written file
        let partial = self.partial_path(kind, id);
        let written = match tokio::fs::write(&partial, data).await {
            Ok(()) => tokio::fs::rename(&partial, self.artifact_path(kind, id)).await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            if let Err(remove_err) = tokio::fs::remove_file(&partial).await {
                tracing::debug!(path = %partial.display(), error = %remove_err, "No partial artifact to remove");
            }
            return Err(e.into());
        }

        Ok(())
    }

    async fn take(&self, kind: ArtifactKind, id: Uuid) -> Result<Vec<u8>, StorageError> {
        let path = self.artifact_path(kind, id);
        let claimed = self.claim_path(kind, id);

        // Rename is atomic: of two racing downloads only one wins the file
        match tokio::fs::rename(&path, &claimed).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::ArtifactNotFound(kind.file_name(id)));
            }
            Err(e) => return Err(e.into()),
        }

        match tokio::fs::read(&claimed).await {
            Ok(data) => {
                if let Err(e) = tokio::fs::remove_file(&claimed).await {
                    tracing::warn!(path = %claimed.display(), error = %e, "Failed to remove claimed artifact");
                }
                Ok(data)
            }
            Err(e) => {
                // Put it back so a retry can still be served
                if let Err(restore_err) = tokio::fs::rename(&claimed, &path).await {
                    tracing::warn!(path = %claimed.display(), error = %restore_err, "Failed to restore claimed artifact");
                }
                Err(e.into())
            }
        }
    }

    async fn sweep(&self, cutoff: DateTime<Utc>) -> Result<usize, StorageError> {
        let removed = remove_older_than(&self.base_path, cutoff, |name| {
            ArtifactKind::ALL
                .iter()
                .any(|kind| kind.matches(name) || kind.matches_scratch(name))
        })
        .await?;

        Ok(removed)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn staged(dir: &TempDir, kind: ArtifactKind, id: Uuid) -> bool {
        dir.path().join(kind.file_name(id)).exists()
    }

    #[tokio::test]
    async fn test_store_and_take() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::with_local_storage(temp_dir.path().to_path_buf());

        let id = store.store(ArtifactKind::Processed, b"%PDF-data").await.unwrap();
        assert!(temp_dir.path().join(format!("processed-{}.pdf", id)).exists());

        let data = store.take(ArtifactKind::Processed, id).await.unwrap();
        assert_eq!(data, b"%PDF-data");
        assert!(!staged(&temp_dir, ArtifactKind::Processed, id));

        // Nothing left behind, claim files included
        let leftover = std::fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(leftover, 0);
    }

    #[tokio::test]
    async fn test_take_twice() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::with_local_storage(temp_dir.path().to_path_buf());

        let id = store.store(ArtifactKind::Template, b"pdf").await.unwrap();
        store.take(ArtifactKind::Template, id).await.unwrap();

        let second = store.take(ArtifactKind::Template, id).await;
        assert!(matches!(second, Err(StorageError::ArtifactNotFound(_))));
    }

    #[tokio::test]
    async fn test_take_wrong_kind() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::with_local_storage(temp_dir.path().to_path_buf());

        let id = store.store(ArtifactKind::Template, b"pdf").await.unwrap();
        let result = store.take(ArtifactKind::Processed, id).await;
        assert!(matches!(result, Err(StorageError::ArtifactNotFound(_))));
        assert!(staged(&temp_dir, ArtifactKind::Template, id));
    }

    #[tokio::test]
    async fn test_generations_do_not_collide() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::with_local_storage(temp_dir.path().to_path_buf());

        let first = store.store(ArtifactKind::Processed, b"first").await.unwrap();
        let second = store.store(ArtifactKind::Processed, b"second").await.unwrap();
        assert_ne!(first, second);

        assert_eq!(store.take(ArtifactKind::Processed, second).await.unwrap(), b"second");
        assert_eq!(store.take(ArtifactKind::Processed, first).await.unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_concurrent_take_serves_once() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::with_local_storage(temp_dir.path().to_path_buf());
        let id = store.store(ArtifactKind::Processed, b"once").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.take(ArtifactKind::Processed, id).await
            }));
        }

        let mut served = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(data) => {
                    assert_eq!(data, b"once");
                    served += 1;
                }
                Err(StorageError::ArtifactNotFound(_)) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(served, 1);
    }

    #[tokio::test]
    async fn test_sweep_respects_cutoff() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::with_local_storage(temp_dir.path().to_path_buf());

        let id = store.store(ArtifactKind::Processed, b"pdf").await.unwrap();
        std::fs::write(temp_dir.path().join("unrelated.txt"), b"keep").unwrap();

        // Nothing is older than an hour yet
        assert_eq!(store.sweep(chrono::Duration::hours(1)).await.unwrap(), 0);
        assert!(staged(&temp_dir, ArtifactKind::Processed, id));

        // Everything is older than a cutoff in the future
        assert_eq!(store.sweep(chrono::Duration::seconds(-60)).await.unwrap(), 1);
        assert!(!staged(&temp_dir, ArtifactKind::Processed, id));
        assert!(temp_dir.path().join("unrelated.txt").exists());

        // A TTL too large to subtract from now removes nothing
        let kept = store.store(ArtifactKind::Template, b"pdf").await.unwrap();
        assert_eq!(store.sweep(chrono::Duration::MAX).await.unwrap(), 0);
        assert!(staged(&temp_dir, ArtifactKind::Template, kept));
    }

    #[tokio::test]
    async fn test_sweep_removes_leftover_scratch_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::with_local_storage(temp_dir.path().to_path_buf());

        let id = Uuid::new_v4();
        let partial = format!(".processed-{}.pdf.partial", id);
        let claim = format!(".template-{}.pdf.claim-{}", id, Uuid::new_v4().simple());
        let foreign = format!(".other-{}.pdf.partial", id);
        for name in [&partial, &claim, &foreign] {
            std::fs::write(temp_dir.path().join(name), b"stale").unwrap();
        }

        assert_eq!(store.sweep(chrono::Duration::seconds(-60)).await.unwrap(), 2);
        assert!(!temp_dir.path().join(&partial).exists());
        assert!(!temp_dir.path().join(&claim).exists());
        assert!(temp_dir.path().join(&foreign).exists());
    }

    #[tokio::test]
    async fn test_failed_read_keeps_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::with_local_storage(temp_dir.path().to_path_buf());

        // A directory can be claimed by rename but not read
        let id = Uuid::new_v4();
        std::fs::create_dir(temp_dir.path().join(ArtifactKind::Processed.file_name(id))).unwrap();

        let result = store.take(ArtifactKind::Processed, id).await;
        assert!(matches!(result, Err(StorageError::Io(_))));
        assert!(temp_dir
            .path()
            .join(ArtifactKind::Processed.file_name(id))
            .is_dir());

        let leftover: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftover.len(), 1);
    }

    #[test]
    fn test_kind_matches() {
        let id = Uuid::new_v4();
        assert!(ArtifactKind::Processed.matches(&format!("processed-{}.pdf", id)));
        assert!(!ArtifactKind::Processed.matches(&format!("template-{}.pdf", id)));
        assert!(!ArtifactKind::Processed.matches("processed-notauuid.pdf"));
        assert!(!ArtifactKind::Template.matches(&format!(".template-{}.pdf.partial", id)));
    }

    #[test]
    fn test_kind_matches_scratch() {
        let id = Uuid::new_v4();
        let token = Uuid::new_v4().simple();
        let kind = ArtifactKind::Template;
        assert!(kind.matches_scratch(&format!(".template-{}.pdf.partial", id)));
        assert!(kind.matches_scratch(&format!(".template-{}.pdf.claim-{}", id, token)));
        assert!(!kind.matches_scratch(&format!("template-{}.pdf", id)));
        assert!(!kind.matches_scratch(&format!(".template-{}.pdf.claim-x", id)));
        assert!(!kind.matches_scratch(&format!(".processed-{}.pdf.partial", id)));
        assert!(!kind.matches_scratch(".template-notauuid.pdf.partial"));
    }
}
