//! End-to-end pipeline tests over in-memory collaborators.

use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use backdrop_core::config::{Config, PromptStrategy, StorageBackend};
use backdrop_core::models::{ProjectRecord, ProjectStatus, StorageEvent, UploadMetadata};
use backdrop_db::{MemoryProjectStore, ProjectStore, StatusUpdate, StoreResult};
use backdrop_pipeline::testing::{image_response, text_response, ScriptedInferenceClient};
use backdrop_pipeline::{Pipeline, PipelineOutcome};
use backdrop_storage::{MemoryStorage, ObjectStorage};
use image::{ImageFormat, Rgba, RgbaImage};

fn test_config(strategy: PromptStrategy) -> Config {
    Config {
        server_port: 8080,
        environment: "test".to_string(),
        storage_backend: StorageBackend::Memory,
        local_storage_path: None,
        local_storage_base_url: None,
        inference_base_url: Some("http://localhost:9090".to_string()),
        inference_api_key: None,
        edit_endpoint_id: "image-edit".to_string(),
        segmentation_endpoint_id: "image-segmentation".to_string(),
        vision_endpoint_id: "vision-analysis".to_string(),
        prompt_strategy: strategy,
        aspect_ratio: "1:1".to_string(),
        edit_mode: None,
        backdrop_color: (255, 255, 255),
        resolver_max_attempts: 5,
        resolver_retry_delay_ms: 1,
        invocation_timeout_secs: 300,
    }
}

fn upload_png() -> Vec<u8> {
    let mut img = RgbaImage::from_pixel(24, 24, Rgba([225, 225, 228, 255]));
    for y in 8..16 {
        for x in 8..16 {
            img.put_pixel(x, y, Rgba([190, 40, 40, 255]));
        }
    }
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

fn upload_event(path: &str, project_id: Option<&str>, user_prompt: Option<&str>) -> StorageEvent {
    StorageEvent {
        bucket: "uploads-bucket".to_string(),
        object_path: path.to_string(),
        content_type: Some("image/png".to_string()),
        size: None,
        metadata: Some(UploadMetadata {
            project_id: project_id.map(str::to_string),
            user_prompt: user_prompt.map(str::to_string),
            original_name: None,
        }),
    }
}

fn pending_record(id: &str, owner: &str, path: &str) -> ProjectRecord {
    ProjectRecord::new_pending(
        id,
        owner,
        "Test product",
        path,
        format!("https://cdn.example.com/{path}"),
    )
}

struct Fixture {
    store: Arc<MemoryProjectStore>,
    storage: Arc<MemoryStorage>,
    inference: Arc<ScriptedInferenceClient>,
    pipeline: Pipeline,
}

fn fixture(strategy: PromptStrategy) -> Fixture {
    let store = Arc::new(MemoryProjectStore::new());
    let storage = Arc::new(MemoryStorage::new());
    let inference = Arc::new(ScriptedInferenceClient::new());
    let pipeline = Pipeline::new(
        store.clone(),
        storage.clone(),
        inference.clone(),
        test_config(strategy),
    );
    Fixture {
        store,
        storage,
        inference,
        pipeline,
    }
}

/// Store wrapper counting every operation, to prove out-of-scope events
/// touch nothing.
#[derive(Default)]
struct CountingStore {
    inner: MemoryProjectStore,
    operations: AtomicU32,
}

#[async_trait::async_trait]
impl ProjectStore for CountingStore {
    async fn get(&self, owner_id: &str, project_id: &str) -> StoreResult<Option<ProjectRecord>> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        self.inner.get(owner_id, project_id).await
    }

    async fn find_by_storage_path(
        &self,
        owner_id: &str,
        storage_path: &str,
    ) -> StoreResult<Option<ProjectRecord>> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_storage_path(owner_id, storage_path).await
    }

    async fn insert(&self, record: ProjectRecord) -> StoreResult<()> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(record).await
    }

    async fn transition(
        &self,
        owner_id: &str,
        project_id: &str,
        update: StatusUpdate,
    ) -> StoreResult<ProjectRecord> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        self.inner.transition(owner_id, project_id, update).await
    }
}

#[tokio::test]
async fn out_of_scope_events_touch_nothing() {
    let store = Arc::new(CountingStore::default());
    let storage = Arc::new(MemoryStorage::new());
    let pipeline = Pipeline::new(
        store.clone(),
        storage.clone(),
        Arc::new(ScriptedInferenceClient::new()),
        test_config(PromptStrategy::VisionGuided),
    );

    // Wrong folder.
    let outcome = pipeline
        .handle_event(upload_event("owners/u1/results/a.png", Some("p1"), None))
        .await;
    assert_eq!(outcome, PipelineOutcome::Skipped);

    // Not an image.
    let mut event = upload_event("owners/u1/uploads/a.pdf", Some("p1"), None);
    event.content_type = Some("application/pdf".to_string());
    assert_eq!(pipeline.handle_event(event).await, PipelineOutcome::Skipped);

    // Missing content type.
    let mut event = upload_event("owners/u1/uploads/a.png", Some("p1"), None);
    event.content_type = None;
    assert_eq!(pipeline.handle_event(event).await, PipelineOutcome::Skipped);

    assert_eq!(store.operations.load(Ordering::SeqCst), 0);
    assert_eq!(storage.object_count().await, 0);
}

#[tokio::test]
async fn promptless_upload_completes_via_local_path() {
    let f = fixture(PromptStrategy::VisionGuided);
    let path = "owners/u1/uploads/mug.png";
    f.storage.put(path, upload_png()).await;
    f.store.insert(pending_record("p1", "u1", path)).await.unwrap();

    let outcome = f.pipeline.handle_event(upload_event(path, Some("p1"), None)).await;

    let record = f.store.get("u1", "p1").await.unwrap().unwrap();
    assert_eq!(record.status, ProjectStatus::Completed);
    let url = record.processed_url.clone().unwrap();
    assert_eq!(url, "http://storage.local/owners/u1/results/p1.png");
    assert_eq!(outcome, PipelineOutcome::Completed { processed_url: url });
    assert!(record.error.is_none());
    assert!(record.updated_at >= record.created_at);

    // No inference involved on the local path.
    assert!(f.inference.calls().is_empty());
    assert!(f.storage.exists("owners/u1/results/p1.png").await.unwrap());
}

#[tokio::test]
async fn local_path_output_is_deterministic() {
    let run = || async {
        let f = fixture(PromptStrategy::VisionGuided);
        let path = "owners/u1/uploads/mug.png";
        f.storage.put(path, upload_png()).await;
        f.store.insert(pending_record("p1", "u1", path)).await.unwrap();
        f.pipeline.handle_event(upload_event(path, Some("p1"), None)).await;
        f.storage.download("owners/u1/results/p1.png").await.unwrap()
    };

    assert_eq!(run().await, run().await);
}

#[tokio::test]
async fn prompted_upload_runs_vision_guided_strategy() {
    let f = fixture(PromptStrategy::VisionGuided);
    let path = "owners/u1/uploads/bottle.png";
    f.storage.put(path, upload_png()).await;
    f.store.insert(pending_record("p1", "u1", path)).await.unwrap();

    f.inference.enqueue(
        "vision-analysis",
        text_response(
            r#"{"productDescription": "steel water bottle", "extractedText": "HYDRA"}"#,
        ),
    );
    f.inference.enqueue("image-edit", image_response(b"generated png"));

    let outcome = f
        .pipeline
        .handle_event(upload_event(path, Some("p1"), Some("floating in a pool")))
        .await;

    assert!(matches!(outcome, PipelineOutcome::Completed { .. }));
    let record = f.store.get("u1", "p1").await.unwrap().unwrap();
    assert_eq!(record.status, ProjectStatus::Completed);

    let calls = f.inference.calls();
    assert_eq!(calls.len(), 2);
    let prompt = calls[1].instance.get_str("prompt").unwrap();
    assert!(prompt.contains("floating in a pool"));
    assert!(prompt.contains("steel water bottle"));

    assert_eq!(
        f.storage.download("owners/u1/results/p1.png").await.unwrap(),
        b"generated png".to_vec()
    );
}

#[tokio::test]
async fn zero_predictions_marks_record_errored_without_artifact() {
    let f = fixture(PromptStrategy::DirectEdit);
    let path = "owners/u1/uploads/mug.png";
    f.storage.put(path, upload_png()).await;
    f.store.insert(pending_record("p1", "u1", path)).await.unwrap();

    f.inference.enqueue(
        "image-edit",
        backdrop_inference::PredictResponse {
            predictions: vec![],
        },
    );

    let outcome = f
        .pipeline
        .handle_event(upload_event(path, Some("p1"), Some("on marble")))
        .await;

    assert!(matches!(outcome, PipelineOutcome::Failed { .. }));
    let record = f.store.get("u1", "p1").await.unwrap().unwrap();
    assert_eq!(record.status, ProjectStatus::Error);
    let message = record.error.unwrap();
    assert!(!message.is_empty());
    assert!(record.processed_url.is_none());

    // Only the original upload in storage; no artifact was written.
    assert_eq!(f.storage.object_count().await, 1);
}

#[tokio::test]
async fn upstream_transport_error_marks_record_errored() {
    let f = fixture(PromptStrategy::DirectEdit);
    let path = "owners/u1/uploads/mug.png";
    f.storage.put(path, upload_png()).await;
    f.store.insert(pending_record("p1", "u1", path)).await.unwrap();

    f.inference.enqueue_error("image-edit", "connection reset by peer");

    f.pipeline
        .handle_event(upload_event(path, Some("p1"), Some("on marble")))
        .await;

    let record = f.store.get("u1", "p1").await.unwrap().unwrap();
    assert_eq!(record.status, ProjectStatus::Error);
    assert!(record.error.unwrap().contains("connection reset by peer"));
}

#[tokio::test]
async fn undecodable_upload_marks_record_errored_on_local_path() {
    let f = fixture(PromptStrategy::VisionGuided);
    let path = "owners/u1/uploads/mug.png";
    f.storage.put(path, b"not an image at all".to_vec()).await;
    f.store.insert(pending_record("p1", "u1", path)).await.unwrap();

    f.pipeline.handle_event(upload_event(path, Some("p1"), None)).await;

    let record = f.store.get("u1", "p1").await.unwrap().unwrap();
    assert_eq!(record.status, ProjectStatus::Error);
    assert!(record.error.unwrap().contains("Local processing failed"));
}

#[tokio::test]
async fn unresolvable_record_leaves_store_unmutated() {
    let f = fixture(PromptStrategy::VisionGuided);
    let path = "owners/u1/uploads/mug.png";
    f.storage.put(path, upload_png()).await;

    let outcome = f
        .pipeline
        .handle_event(upload_event(path, Some("missing"), None))
        .await;

    assert!(matches!(outcome, PipelineOutcome::Failed { .. }));
    // Nothing to mark; the only storage object is still the upload.
    assert_eq!(f.storage.object_count().await, 1);
}

#[tokio::test]
async fn fallback_correlation_uses_file_stem_for_artifact() {
    let f = fixture(PromptStrategy::VisionGuided);
    let path = "owners/u1/uploads/mug.png";
    f.storage.put(path, upload_png()).await;
    f.store.insert(pending_record("p1", "u1", path)).await.unwrap();

    // No projectId in metadata: resolution goes through the storage path.
    let event = StorageEvent {
        bucket: "uploads-bucket".to_string(),
        object_path: path.to_string(),
        content_type: Some("image/png".to_string()),
        size: None,
        metadata: None,
    };
    let outcome = f.pipeline.handle_event(event).await;

    assert!(matches!(outcome, PipelineOutcome::Completed { .. }));
    let record = f.store.get("u1", "p1").await.unwrap().unwrap();
    assert_eq!(record.status, ProjectStatus::Completed);
    assert_eq!(
        record.processed_url.as_deref(),
        Some("http://storage.local/owners/u1/results/mug.png")
    );
}

#[tokio::test]
async fn duplicate_invocation_is_first_claim_wins() {
    let f = fixture(PromptStrategy::VisionGuided);
    let path = "owners/u1/uploads/mug.png";
    f.storage.put(path, upload_png()).await;
    f.store.insert(pending_record("p1", "u1", path)).await.unwrap();

    let first = f.pipeline.handle_event(upload_event(path, Some("p1"), None)).await;
    let PipelineOutcome::Completed { processed_url } = first else {
        panic!("first invocation should complete, got {:?}", first);
    };

    // At-least-once delivery: the same event arrives again. The record is
    // already terminal, so the pending->processing claim conflicts.
    let second = f.pipeline.handle_event(upload_event(path, Some("p1"), None)).await;
    assert_eq!(second, PipelineOutcome::AlreadyClaimed);

    let record = f.store.get("u1", "p1").await.unwrap().unwrap();
    assert_eq!(record.status, ProjectStatus::Completed);
    assert_eq!(record.processed_url.as_deref(), Some(processed_url.as_str()));
    assert!(record.error.is_none());
}

#[tokio::test]
async fn concurrent_duplicate_invocations_yield_one_claim() {
    let f = fixture(PromptStrategy::VisionGuided);
    let path = "owners/u1/uploads/mug.png";
    f.storage.put(path, upload_png()).await;
    f.store.insert(pending_record("p1", "u1", path)).await.unwrap();

    let (a, b) = tokio::join!(
        f.pipeline.handle_event(upload_event(path, Some("p1"), None)),
        f.pipeline.handle_event(upload_event(path, Some("p1"), None)),
    );

    let completions = [&a, &b]
        .iter()
        .filter(|o| matches!(o, PipelineOutcome::Completed { .. }))
        .count();
    let claims_lost = [&a, &b]
        .iter()
        .filter(|o| matches!(o, PipelineOutcome::AlreadyClaimed))
        .count();
    assert_eq!(completions, 1);
    assert_eq!(claims_lost, 1);

    let record = f.store.get("u1", "p1").await.unwrap().unwrap();
    assert_eq!(record.status, ProjectStatus::Completed);
    assert!(record.processed_url.is_some());
}
