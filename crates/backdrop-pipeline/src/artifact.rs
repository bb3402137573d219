//! Artifact writer
//!
//! Persists the processed raster at its deterministic result key and returns
//! the public URL. Not transactional with the subsequent status update: a
//! crash between the two leaves an orphaned artifact behind, never a record
//! pointing at a missing one.

use std::sync::Arc;

use backdrop_storage::{keys::result_key, ObjectStorage};

use crate::error::PipelineError;

pub struct ArtifactWriter {
    storage: Arc<dyn ObjectStorage>,
}

impl ArtifactWriter {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Write the processed bytes for `(owner_id, stem)` and return the
    /// artifact's stable public URL.
    pub async fn write(
        &self,
        owner_id: &str,
        stem: &str,
        data: Vec<u8>,
    ) -> Result<String, PipelineError> {
        let key = result_key(owner_id, stem);
        let size = data.len();
        let url = self.storage.upload_public(&key, data, "image/png").await?;

        tracing::info!(
            owner_id = %owner_id,
            key = %key,
            size_bytes = size,
            "Artifact written"
        );

        Ok(url)
    }
}
