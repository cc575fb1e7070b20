//! Retention sweeping
//!
//! Uploaded templates and undownloaded artifacts would otherwise accumulate
//! forever. A background task periodically removes anything older than its
//! configured time-to-live.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::artifacts::ArtifactStore;
use super::templates::TemplateStore;
use crate::config::RetentionConfig;

/// How long stored files are kept and how often they are checked
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    pub template_ttl: chrono::Duration,
    pub artifact_ttl: chrono::Duration,
    pub sweep_interval: Duration,
}

impl From<&RetentionConfig> for RetentionPolicy {
    fn from(config: &RetentionConfig) -> Self {
        Self {
            template_ttl: ttl(config.template_ttl_secs),
            artifact_ttl: ttl(config.artifact_ttl_secs),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs.max(1)),
        }
    }
}

/// Seconds to a TTL, saturating instead of wrapping
fn ttl(secs: u64) -> chrono::Duration {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}

/// Cutoff for files older than `max_age`, `None` when it predates any
/// representable time and nothing can be that old.
pub(crate) fn cutoff(max_age: chrono::Duration) -> Option<DateTime<Utc>> {
    Utc::now().checked_sub_signed(max_age)
}

/// Periodic cleanup of templates and artifacts
#[derive(Clone)]
pub struct Sweeper {
    templates: TemplateStore,
    artifacts: ArtifactStore,
    policy: RetentionPolicy,
}

impl Sweeper {
    pub fn new(templates: TemplateStore, artifacts: ArtifactStore, policy: RetentionPolicy) -> Self {
        Self {
            templates,
            artifacts,
            policy,
        }
    }

    /// Run one sweep. Returns `(templates_removed, artifacts_removed)`.
    pub async fn sweep_once(&self) -> (usize, usize) {
        let templates = match self.templates.sweep(self.policy.template_ttl).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "Template sweep failed");
                0
            }
        };

        let artifacts = match self.artifacts.sweep(self.policy.artifact_ttl).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "Artifact sweep failed");
                0
            }
        };

        if templates > 0 || artifacts > 0 {
            tracing::info!(templates, artifacts, "Removed expired files");
        }

        (templates, artifacts)
    }

    /// Start background cleanup task
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.policy.sweep_interval);

            loop {
                interval.tick().await;
                self.sweep_once().await;
            }
        })
    }
}

/// Delete regular files in `dir` whose name satisfies `matches` and whose
/// modification time is before `cutoff`. A missing directory counts as empty.
pub(crate) async fn remove_older_than<F>(
    dir: &Path,
    cutoff: DateTime<Utc>,
    matches: F,
) -> std::io::Result<usize>
where
    F: Fn(&str) -> bool,
{
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !matches(name) {
            continue;
        }

        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }

        let modified: DateTime<Utc> = metadata.modified()?.into();
        if modified >= cutoff {
            continue;
        }

        // Another sweeper or a download may have removed it already
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => {
                removed += 1;
                tracing::debug!(file = %name, "Removed expired file");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ArtifactKind;
    use tempfile::TempDir;

    fn policy(ttl_secs: i64) -> RetentionPolicy {
        RetentionPolicy {
            template_ttl: chrono::Duration::seconds(ttl_secs),
            artifact_ttl: chrono::Duration::seconds(ttl_secs),
            sweep_interval: Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn test_remove_older_than_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        let removed = remove_older_than(&missing, Utc::now(), |_| true).await.unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn test_remove_older_than_filters_names() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.pdf"), b"a").unwrap();
        std::fs::write(temp_dir.path().join("b.txt"), b"b").unwrap();
        std::fs::create_dir(temp_dir.path().join("c.pdf")).unwrap();

        let cutoff = Utc::now() + chrono::Duration::minutes(1);
        let removed = remove_older_than(temp_dir.path(), cutoff, |name| name.ends_with(".pdf"))
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert!(!temp_dir.path().join("a.pdf").exists());
        assert!(temp_dir.path().join("b.txt").exists());
        assert!(temp_dir.path().join("c.pdf").is_dir());
    }

    #[tokio::test]
    async fn test_sweep_once() {
        let temp_dir = TempDir::new().unwrap();
        let templates = TemplateStore::new(temp_dir.path().to_path_buf());
        let artifacts = ArtifactStore::with_local_storage(temp_dir.path().to_path_buf());

        let template = templates.save(b"%PDF-template").await.unwrap();
        let id = artifacts.store(ArtifactKind::Processed, b"%PDF-out").await.unwrap();

        // Fresh files survive a normal policy
        let kept = Sweeper::new(templates.clone(), artifacts.clone(), policy(3600));
        assert_eq!(kept.sweep_once().await, (0, 0));

        // A negative TTL puts the cutoff in the future
        let strict = Sweeper::new(templates.clone(), artifacts.clone(), policy(-60));
        assert_eq!(strict.sweep_once().await, (1, 1));

        assert!(templates.read(&template.file_path).await.is_err());
        assert!(!temp_dir
            .path()
            .join(format!("processed-{}.pdf", id))
            .exists());
    }

    #[test]
    fn test_policy_from_config() {
        let config = RetentionConfig {
            template_ttl_secs: 3600,
            artifact_ttl_secs: 900,
            sweep_interval_secs: 0,
            delete_template_after_generate: false,
        };
        let policy = RetentionPolicy::from(&config);
        assert_eq!(policy.template_ttl, chrono::Duration::hours(1));
        assert_eq!(policy.artifact_ttl, chrono::Duration::minutes(15));
        assert_eq!(policy.sweep_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_policy_saturates_huge_ttl() {
        let config = RetentionConfig {
            template_ttl_secs: u64::MAX,
            artifact_ttl_secs: 1_000_000_000_000_000,
            sweep_interval_secs: 60,
            delete_template_after_generate: false,
        };
        let policy = RetentionPolicy::from(&config);
        assert!(policy.template_ttl > chrono::Duration::zero());
        assert!(policy.artifact_ttl > chrono::Duration::zero());
        assert!(cutoff(policy.template_ttl).is_none());
    }

    #[tokio::test]
    async fn test_sweep_with_huge_ttl_keeps_everything() {
        let temp_dir = TempDir::new().unwrap();
        let templates = TemplateStore::new(temp_dir.path().to_path_buf());
        let artifacts = ArtifactStore::with_local_storage(temp_dir.path().to_path_buf());

        let template = templates.save(b"%PDF-template").await.unwrap();
        artifacts.store(ArtifactKind::Template, b"%PDF-out").await.unwrap();

        let config = RetentionConfig {
            template_ttl_secs: u64::MAX,
            artifact_ttl_secs: 1_000_000_000_000_000,
            sweep_interval_secs: 60,
            delete_template_after_generate: false,
        };
        let sweeper = Sweeper::new(templates.clone(), artifacts, RetentionPolicy::from(&config));
        assert_eq!(sweeper.sweep_once().await, (0, 0));
        assert!(templates.read(&template.file_path).await.is_ok());
    }
}
