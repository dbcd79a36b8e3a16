//! Processed-set tracker.
//!
//! Records which source documents have been fully ingested so that
//! re-running ingestion skips them. A marker is written only after the
//! document's passages were upserted; a crash before that point leaves
//! no marker and the document is retried on the next run.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::{RagError, Result};

#[async_trait]
pub trait ProcessedSet: Send + Sync {
    /// True iff `id` has a marker. Unreadable stores count as "not processed".
    async fn has_processed(&self, id: &str) -> bool;

    /// Durably record `id` as ingested.
    async fn mark_processed(&self, id: &str) -> Result<()>;
}

/// Zero-byte `<id>.processed` files in one directory.
#[derive(Debug, Clone)]
pub struct MarkerDir {
    dir: PathBuf,
}

impl MarkerDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn marker_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.processed", id))
    }
}

#[async_trait]
impl ProcessedSet for MarkerDir {
    async fn has_processed(&self, id: &str) -> bool {
        let path = self.marker_path(id);
        match tokio::fs::try_exists(&path).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!(marker = %path.display(), error = %e, "cannot read marker, treating as unprocessed");
                false
            }
        }
    }

    async fn mark_processed(&self, id: &str) -> Result<()> {
        let tracker_err = |e: std::io::Error| RagError::Tracker {
            id: id.to_string(),
            message: e.to_string(),
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(tracker_err)?;
        let file = tokio::fs::File::create(self.marker_path(id))
            .await
            .map_err(tracker_err)?;
        file.sync_all().await.map_err(tracker_err)?;
        Ok(())
    }
}
