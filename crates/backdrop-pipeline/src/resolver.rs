//! Metadata resolver
//!
//! Correlates a storage event with its project record. The record is created
//! by a different system moments before the upload finishes, and
//! read-your-own-write consistency across the two is not guaranteed, so the
//! direct-id path retries a bounded number of times. The storage-path
//! fallback does not retry; an upload without a `projectId` in its metadata
//! predates that consistency fix and keeps the old behavior.

use std::time::Duration;

use backdrop_core::models::{ProjectRecord, StorageEvent, UploadPath};
use backdrop_db::ProjectStore;
use tokio::time::sleep;

use crate::error::PipelineError;

pub struct Resolver<'a> {
    store: &'a dyn ProjectStore,
    max_attempts: u32,
    retry_delay: Duration,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a dyn ProjectStore, max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            store,
            max_attempts,
            retry_delay,
        }
    }

    /// Resolve the record for `event`. Uses the metadata `projectId` when
    /// present (with retry), otherwise falls back to a storage-path lookup
    /// (no retry). Read-only.
    pub async fn resolve(
        &self,
        event: &StorageEvent,
        path: &UploadPath,
    ) -> Result<ProjectRecord, PipelineError> {
        match event.project_id() {
            Some(project_id) => self.resolve_by_id(&path.owner_id, project_id).await,
            None => self.resolve_by_path(&path.owner_id, &event.object_path).await,
        }
    }

    async fn resolve_by_id(
        &self,
        owner_id: &str,
        project_id: &str,
    ) -> Result<ProjectRecord, PipelineError> {
        for attempt in 1..=self.max_attempts {
            if let Some(record) = self.store.get(owner_id, project_id).await? {
                tracing::debug!(
                    owner_id = %owner_id,
                    project_id = %project_id,
                    attempt = attempt,
                    "Resolved project record"
                );
                return Ok(record);
            }

            tracing::debug!(
                owner_id = %owner_id,
                project_id = %project_id,
                attempt = attempt,
                max_attempts = self.max_attempts,
                "Project record not visible yet"
            );

            if attempt < self.max_attempts {
                sleep(self.retry_delay).await;
            }
        }

        Err(PipelineError::NotFound(format!(
            "project {} for owner {} after {} attempts",
            project_id, owner_id, self.max_attempts
        )))
    }

    async fn resolve_by_path(
        &self,
        owner_id: &str,
        object_path: &str,
    ) -> Result<ProjectRecord, PipelineError> {
        self.store
            .find_by_storage_path(owner_id, object_path)
            .await?
            .ok_or_else(|| {
                PipelineError::NotFound(format!(
                    "no project of owner {} with storage path {}",
                    owner_id, object_path
                ))
            })
    }
}
