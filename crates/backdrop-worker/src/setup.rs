//! Dependency wiring
//!
//! Builds the concrete store, storage, and inference client from
//! configuration and hands the assembled pipeline to the router. All
//! dependencies are constructed here and injected; nothing is process-global.

use std::sync::Arc;

use anyhow::{Context, Result};
use backdrop_core::config::{Config, StorageBackend};
use backdrop_db::{MemoryProjectStore, ProjectStore};
use backdrop_inference::{HttpInferenceClient, InferenceClient};
use backdrop_pipeline::Pipeline;
use backdrop_storage::{LocalStorage, MemoryStorage, ObjectStorage};

pub struct AppState {
    pub pipeline: Pipeline,
    pub config: Config,
    pub storage: Arc<dyn ObjectStorage>,
}

pub async fn build_state(config: Config) -> Result<Arc<AppState>> {
    let storage: Arc<dyn ObjectStorage> = match config.storage_backend {
        StorageBackend::Local => {
            let path = config
                .local_storage_path
                .clone()
                .context("BACKDROP_LOCAL_STORAGE_PATH not set")?;
            let base_url = config
                .local_storage_base_url
                .clone()
                .context("BACKDROP_LOCAL_STORAGE_BASE_URL not set")?;
            Arc::new(
                LocalStorage::new(path, base_url)
                    .await
                    .context("Failed to initialize local storage")?,
            )
        }
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
    };

    // The production document store is deployment-specific and lives behind
    // the same trait; the in-memory backend is the reference wiring.
    let store: Arc<dyn ProjectStore> = Arc::new(MemoryProjectStore::new());

    // With the copy strategy no inference call is ever made; the placeholder
    // URL keeps construction uniform and is validated away for remote
    // strategies by Config::validate.
    let inference_base_url = config
        .inference_base_url
        .clone()
        .unwrap_or_else(|| "http://127.0.0.1:9".to_string());
    let inference: Arc<dyn InferenceClient> = Arc::new(
        HttpInferenceClient::new(inference_base_url, config.inference_api_key.clone())
            .context("Failed to initialize inference client")?,
    );

    let pipeline = Pipeline::new(store, storage.clone(), inference, config.clone());

    Ok(Arc::new(AppState {
        pipeline,
        config,
        storage,
    }))
}
