//! Application state management

use std::sync::Arc;

use uuid::Uuid;

use crate::config::Config;
use crate::storage::{ArtifactKind, ArtifactStore, RetentionPolicy, Sweeper, TemplateStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    templates: TemplateStore,
    artifacts: ArtifactStore,
}

impl AppState {
    /// Create a new application state
    ///
    /// Templates and artifacts share the configured uploads directory.
    pub fn new(config: Config) -> Self {
        let upload_dir = config.storage.upload_dir.clone();

        Self {
            inner: Arc::new(AppStateInner {
                templates: TemplateStore::new(upload_dir.clone()),
                artifacts: ArtifactStore::with_local_storage(upload_dir),
                config,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the template store
    pub fn templates(&self) -> &TemplateStore {
        &self.inner.templates
    }

    /// Get the artifact store
    pub fn artifacts(&self) -> &ArtifactStore {
        &self.inner.artifacts
    }

    /// Absolute URL a client uses to fetch an artifact
    pub fn download_url(&self, kind: ArtifactKind, id: Uuid) -> String {
        format!(
            "{}{}?id={}",
            self.inner.config.server.public_url,
            kind.download_route(),
            id
        )
    }

    /// Background sweeper for this state's stores
    pub fn sweeper(&self) -> Sweeper {
        Sweeper::new(
            self.inner.templates.clone(),
            self.inner.artifacts.clone(),
            RetentionPolicy::from(&self.inner.config.retention),
        )
    }
}
