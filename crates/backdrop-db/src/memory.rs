use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use backdrop_core::models::ProjectRecord;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::traits::{ProjectStore, StatusUpdate, StoreError, StoreResult};

/// In-memory project store.
///
/// Keeps records in a `RwLock<HashMap>` keyed by `(owner_id, project_id)`.
/// Cheap to clone; all clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryProjectStore {
    records: Arc<RwLock<HashMap<(String, String), ProjectRecord>>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn get(&self, owner_id: &str, project_id: &str) -> StoreResult<Option<ProjectRecord>> {
        let records = self.records.read().await;
        Ok(records
            .get(&(owner_id.to_string(), project_id.to_string()))
            .cloned())
    }

    async fn find_by_storage_path(
        &self,
        owner_id: &str,
        storage_path: &str,
    ) -> StoreResult<Option<ProjectRecord>> {
        let records = self.records.read().await;
        let mut matches: Vec<&ProjectRecord> = records
            .values()
            .filter(|r| r.owner_id == owner_id && r.storage_path == storage_path)
            .collect();
        // Oldest first, so duplicate paths resolve the same way every time.
        matches.sort_by_key(|r| r.created_at);
        Ok(matches.first().map(|r| (*r).clone()))
    }

    async fn insert(&self, record: ProjectRecord) -> StoreResult<()> {
        let key = (record.owner_id.clone(), record.id.clone());
        let mut records = self.records.write().await;
        if records.contains_key(&key) {
            return Err(StoreError::AlreadyExists(record.id));
        }
        records.insert(key, record);
        Ok(())
    }

    async fn transition(
        &self,
        owner_id: &str,
        project_id: &str,
        update: StatusUpdate,
    ) -> StoreResult<ProjectRecord> {
        if !update.expected.can_transition_to(update.next) {
            return Err(StoreError::IllegalTransition {
                from: update.expected,
                to: update.next,
            });
        }

        let mut records = self.records.write().await;
        let record = records
            .get_mut(&(owner_id.to_string(), project_id.to_string()))
            .ok_or_else(|| StoreError::NotFound(project_id.to_string()))?;

        if record.status != update.expected {
            return Err(StoreError::Conflict {
                expected: update.expected,
                actual: record.status,
            });
        }

        record.status = update.next;
        if update.processed_url.is_some() {
            record.processed_url = update.processed_url;
        }
        if update.error.is_some() {
            record.error = update.error;
        }
        record.updated_at = Utc::now();

        Ok(record.clone())
    }
}
