//! Writes print job documents into a directory.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::{BehaviourError, DocumentSink, Job};

/// Saves each document as `ipp-server-print-job-<uuid>.<ext>`.
#[derive(Debug, Clone)]
pub struct SaveToDisk {
    directory: PathBuf,
}

impl SaveToDisk {
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    /// Write `document` to a fresh file and return its path.
    ///
    /// File names are unique per job, so concurrent jobs never share a file.
    pub async fn save(&self, job: &Job, document: &[u8]) -> Result<PathBuf, BehaviourError> {
        let leaf = format!("ipp-server-print-job-{}.{}", Uuid::new_v4(), job.extension);
        let path = self.directory.join(leaf);
        tokio::fs::write(&path, document).await?;
        tracing::info!(job_id = job.id, path = %path.display(), bytes = document.len(), "Saved print job");
        Ok(path)
    }
}

#[async_trait]
impl DocumentSink for SaveToDisk {
    async fn accept(&self, job: &Job, document: Bytes) -> Result<(), BehaviourError> {
        self.save(job, &document).await.map(|_| ())
    }
}
