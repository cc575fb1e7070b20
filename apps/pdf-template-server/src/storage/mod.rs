//! On-disk storage for uploaded templates and generated artifacts
//!
//! Both live under the configured uploads directory:
//!
//! - `uploads/<32 hex>` - uploaded templates
//! - `uploads/processed-<uuid>.pdf` - filled templates awaiting download
//! - `uploads/template-<uuid>.pdf` - free-text pages awaiting download

pub mod artifacts;
pub mod retention;
pub mod templates;

pub use artifacts::{ArtifactKind, ArtifactStorage, ArtifactStore};
pub use retention::{RetentionPolicy, Sweeper};
pub use templates::{StoredTemplate, TemplateStore};

/// Storage error types
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),
}
