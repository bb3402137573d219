use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::traits::{ObjectStorage, StorageError, StorageResult};

/// In-memory object storage, for tests and single-process deployments.
#[derive(Clone)]
pub struct MemoryStorage {
    base_url: String,
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_base_url("http://storage.local")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Seed an object, the way the upload collaborator would have.
    pub async fn put(&self, key: &str, data: Vec<u8>) {
        self.objects.write().await.insert(key.to_string(), data);
    }

    /// Number of stored objects. Test assertions only.
    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn upload_public(
        &self,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<String> {
        self.objects.write().await.insert(key.to_string(), data);
        Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), key))
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.objects.read().await.contains_key(key))
    }
}
