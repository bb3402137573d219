//! Project store trait
//!
//! All record backends must implement this trait. The pipeline only ever
//! reads records and applies status transitions; record creation belongs to
//! the upload collaborator (`insert` exists for that collaborator and for
//! tests).

use async_trait::async_trait;
use backdrop_core::models::{ProjectRecord, ProjectStatus};
use thiserror::Error;

/// Store operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Project not found: {0}")]
    NotFound(String),

    #[error("Project already exists: {0}")]
    AlreadyExists(String),

    #[error("Status is {actual}, expected {expected}")]
    Conflict {
        expected: ProjectStatus,
        actual: ProjectStatus,
    },

    #[error("Illegal status transition: {from} -> {to}")]
    IllegalTransition {
        from: ProjectStatus,
        to: ProjectStatus,
    },

    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A conditional status transition.
///
/// The write succeeds only while the record is still in `expected`; a
/// concurrent invocation that got there first surfaces as
/// [`StoreError::Conflict`] instead of being silently overwritten.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub expected: ProjectStatus,
    pub next: ProjectStatus,
    pub processed_url: Option<String>,
    pub error: Option<String>,
}

impl StatusUpdate {
    pub fn processing() -> Self {
        Self {
            expected: ProjectStatus::Pending,
            next: ProjectStatus::Processing,
            processed_url: None,
            error: None,
        }
    }

    pub fn completed(processed_url: impl Into<String>) -> Self {
        Self {
            expected: ProjectStatus::Processing,
            next: ProjectStatus::Completed,
            processed_url: Some(processed_url.into()),
            error: None,
        }
    }

    pub fn errored(message: impl Into<String>) -> Self {
        Self {
            expected: ProjectStatus::Processing,
            next: ProjectStatus::Error,
            processed_url: None,
            error: Some(message.into()),
        }
    }
}

/// Project record store abstraction
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Read a record by its key. `Ok(None)` when the record does not exist
    /// (yet) — the resolver retries over this.
    async fn get(&self, owner_id: &str, project_id: &str) -> StoreResult<Option<ProjectRecord>>;

    /// Find the first record of `owner_id` whose storage path equals
    /// `storage_path`. Match order is backend-defined; duplicate paths are a
    /// known race of this correlation mode.
    async fn find_by_storage_path(
        &self,
        owner_id: &str,
        storage_path: &str,
    ) -> StoreResult<Option<ProjectRecord>>;

    /// Create a record. Used by the upload collaborator and by tests.
    async fn insert(&self, record: ProjectRecord) -> StoreResult<()>;

    /// Apply a conditional status transition and return the updated record.
    /// Sets `updated_at`; fails with [`StoreError::Conflict`] when the
    /// record is no longer in `update.expected`.
    async fn transition(
        &self,
        owner_id: &str,
        project_id: &str,
        update: StatusUpdate,
    ) -> StoreResult<ProjectRecord>;
}
