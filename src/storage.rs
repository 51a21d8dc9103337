//! Mapping from job IDs to artifact paths on local disk

use crate::error::{Error, Result};
use crate::types::JobId;
use std::path::{Path, PathBuf};

/// Extension of every stored artifact
pub const MEDIA_EXTENSION: &str = "mp4";

/// Storage directory holding exactly one artifact per job
#[derive(Clone, Debug)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Create a storage mapping rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the artifacts
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Artifact path for a job
    pub fn path_for(&self, id: JobId) -> PathBuf {
        self.root.join(format!("{}.{}", id, MEDIA_EXTENSION))
    }

    /// Create the storage directory if it does not exist
    pub async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create storage directory '{}': {}",
                    self.root.display(),
                    e
                ),
            ))
        })
    }

    /// Remove a job's artifact, treating an already-missing file as success
    pub async fn remove(&self, path: &Path) -> std::io::Result<bool> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_is_derived_from_id_with_media_extension() {
        let storage = Storage::new("/srv/media");
        let id = JobId::new();
        let path = storage.path_for(id);

        assert_eq!(path.parent().unwrap(), Path::new("/srv/media"));
        assert_eq!(path.extension().unwrap(), MEDIA_EXTENSION);
        assert_eq!(
            path.file_stem().unwrap().to_str().unwrap(),
            id.to_string()
        );
    }

    #[test]
    fn distinct_ids_never_share_a_path() {
        let storage = Storage::new("/srv/media");
        assert_ne!(storage.path_for(JobId::new()), storage.path_for(JobId::new()));
    }

    #[tokio::test]
    async fn ensure_root_creates_nested_directories() {
        let temp = tempfile::tempdir().unwrap();
        let storage = Storage::new(temp.path().join("a").join("b"));
        storage.ensure_root().await.unwrap();
        assert!(storage.root().is_dir());
    }

    #[tokio::test]
    async fn remove_reports_missing_file_without_error() {
        let temp = tempfile::tempdir().unwrap();
        let storage = Storage::new(temp.path());
        let path = storage.path_for(JobId::new());

        assert!(!storage.remove(&path).await.unwrap());

        std::fs::write(&path, b"partial").unwrap();
        assert!(storage.remove(&path).await.unwrap());
        assert!(!path.exists());
    }
}
