//! HTTP surface: the storage-finalize push endpoint and a health probe.
//!
//! The event endpoint acknowledges every decodable notification with 200 so
//! the delivery transport never retries on processing failures; the record
//! mutation is the durable signal, not the HTTP response.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use backdrop_core::models::StorageEvent;
use backdrop_core::validation::validate_upload;
use backdrop_pipeline::PipelineOutcome;
use backdrop_storage::ObjectStorage;
use tower_http::trace::TraceLayer;

use crate::setup::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/events", post(handle_storage_event))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_storage_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<StorageEvent>,
) -> impl IntoResponse {
    (StatusCode::OK, Json(process_event(&state, event).await))
}

/// Run one notification through upload validation and the pipeline,
/// reporting what happened as a JSON body.
async fn process_event(state: &AppState, event: StorageEvent) -> serde_json::Value {
    if let (Some(content_type), Some(size)) = (event.content_type.as_deref(), event.size) {
        if let Err(e) = validate_upload(content_type, size) {
            tracing::info!(
                object_path = %event.object_path,
                error = %e,
                "Rejecting notification for invalid upload"
            );
            return serde_json::json!({ "outcome": "rejected", "reason": e.to_string() });
        }
    }

    let outcome = tokio::time::timeout(
        state.config.invocation_timeout(),
        state.pipeline.handle_event(event),
    )
    .await;

    match outcome {
        Ok(PipelineOutcome::Skipped) => serde_json::json!({ "outcome": "skipped" }),
        Ok(PipelineOutcome::AlreadyClaimed) => {
            serde_json::json!({ "outcome": "already_claimed" })
        }
        Ok(PipelineOutcome::Completed { processed_url }) => {
            serde_json::json!({ "outcome": "completed", "processedUrl": processed_url })
        }
        Ok(PipelineOutcome::Failed { message }) => {
            serde_json::json!({ "outcome": "failed", "error": message })
        }
        Err(_) => {
            // The record stays in `processing`; there is no reconciliation.
            tracing::error!(
                timeout_secs = state.config.invocation_timeout_secs,
                "Invocation exceeded its wall-clock budget"
            );
            serde_json::json!({ "outcome": "timeout" })
        }
    }
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let storage = match state.storage.exists("health-check-non-existent-key").await {
        Ok(_) => "healthy",
        Err(_) => "degraded",
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive", "storage": storage })),
    )
}
