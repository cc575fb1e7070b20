//! Template Store
//!
//! Uploaded templates are written under opaque generated names. Clients
//! refer back to them by the `filePath` returned from the upload, and only
//! paths naming a generated template are ever resolved.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::retention::{cutoff, remove_older_than};
use super::StorageError;

/// A template that has been written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTemplate {
    pub id: Uuid,
    /// Path reported to the client, e.g. `uploads/5f0c...`
    pub file_path: String,
}

/// Uploaded template files
#[derive(Debug, Clone)]
pub struct TemplateStore {
    base_path: PathBuf,
}

impl TemplateStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Store an uploaded template under a new name
    pub async fn save(&self, data: &[u8]) -> Result<StoredTemplate, StorageError> {
        tokio::fs::create_dir_all(&self.base_path).await?;

        let id = Uuid::new_v4();
        let path = self.template_path(id);
        tokio::fs::write(&path, data).await?;

        tracing::debug!(template_id = %id, size = data.len(), "Template stored");

        Ok(StoredTemplate {
            id,
            file_path: path.to_string_lossy().to_string(),
        })
    }

    /// Map a client-supplied `filePath` back to a stored template.
    ///
    /// Only the file name is consulted and it must be a generated template
    /// name, so `../` tricks and arbitrary paths never reach the filesystem.
    pub fn resolve(&self, file_path: &str) -> Result<PathBuf, StorageError> {
        let id = Path::new(file_path)
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(parse_template_name)
            .ok_or_else(|| StorageError::TemplateNotFound(file_path.to_string()))?;

        Ok(self.template_path(id))
    }

    /// Read a stored template
    pub async fn read(&self, file_path: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(file_path)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::TemplateNotFound(file_path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a stored template. Deleting one that is already gone is not an error.
    pub async fn remove(&self, file_path: &str) -> Result<(), StorageError> {
        let path = self.resolve(file_path)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove templates older than `max_age`
    pub async fn sweep(&self, max_age: chrono::Duration) -> Result<usize, StorageError> {
        let Some(cutoff) = cutoff(max_age) else {
            return Ok(0);
        };
        let removed = remove_older_than(&self.base_path, cutoff, |name| {
            parse_template_name(name).is_some()
        })
        .await?;
        Ok(removed)
    }

    fn template_path(&self, id: Uuid) -> PathBuf {
        self.base_path.join(id.simple().to_string())
    }
}

/// Template files are named by the 32 lowercase hex digits of their id
fn parse_template_name(name: &str) -> Option<Uuid> {
    let id = Uuid::try_parse(name).ok()?;
    (id.simple().to_string() == name).then_some(id)
}
