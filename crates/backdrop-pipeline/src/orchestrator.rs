//! Pipeline orchestrator
//!
//! Drives one storage event from validation to exactly one terminal status
//! transition. Every failure past record resolution is caught here, logged
//! with full detail, and converted into a best-effort `error` update; no
//! error escapes [`Pipeline::handle_event`].

use std::sync::Arc;

use backdrop_core::config::Config;
use backdrop_core::models::{ProjectRecord, StorageEvent, UploadPath};
use backdrop_db::{ProjectStore, StatusUpdate, StoreError};
use backdrop_inference::InferenceClient;
use backdrop_processing::HighFidelityProcessor;
use backdrop_storage::ObjectStorage;

use crate::artifact::ArtifactWriter;
use crate::error::PipelineError;
use crate::resolver::Resolver;
use crate::strategy::{select_strategy, StrategyContext};

/// What one invocation did. Informational only; the record mutation and the
/// written artifact are the real outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Event out of scope; nothing was read or written.
    Skipped,
    /// A concurrent duplicate invocation owns this record.
    AlreadyClaimed,
    Completed {
        processed_url: String,
    },
    Failed {
        message: String,
    },
}

/// The event-triggered processing pipeline. All collaborators are injected;
/// construction is cheap and free of side effects, so the embedding runtime
/// may build one per process or one per invocation.
pub struct Pipeline {
    store: Arc<dyn ProjectStore>,
    storage: Arc<dyn ObjectStorage>,
    inference: Arc<dyn InferenceClient>,
    processor: Arc<HighFidelityProcessor>,
    artifacts: ArtifactWriter,
    config: Config,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        storage: Arc<dyn ObjectStorage>,
        inference: Arc<dyn InferenceClient>,
        config: Config,
    ) -> Self {
        let processor = Arc::new(HighFidelityProcessor::new(config.backdrop_color.into()));
        let artifacts = ArtifactWriter::new(storage.clone());
        Self {
            store,
            storage,
            inference,
            processor,
            artifacts,
            config,
        }
    }

    /// Process one storage-finalize event end to end.
    pub async fn handle_event(&self, event: StorageEvent) -> PipelineOutcome {
        let Some(path) = self.filter(&event) else {
            return PipelineOutcome::Skipped;
        };

        tracing::info!(
            object_path = %event.object_path,
            owner_id = %path.owner_id,
            "Processing upload"
        );

        // Resolution failure is terminal for the invocation: without a
        // record there is nothing to mark errored.
        let resolver = Resolver::new(
            self.store.as_ref(),
            self.config.resolver_max_attempts,
            self.config.resolver_retry_delay(),
        );
        let record = match resolver.resolve(&event, &path).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    object_path = %event.object_path,
                    error = %e,
                    "No matching project record for upload"
                );
                return PipelineOutcome::Failed {
                    message: e.record_message(),
                };
            }
        };

        match self
            .store
            .transition(&path.owner_id, &record.id, StatusUpdate::processing())
            .await
        {
            Ok(_) => {}
            Err(StoreError::Conflict { actual, .. }) => {
                tracing::info!(
                    project_id = %record.id,
                    status = %actual,
                    "Record already claimed by a concurrent invocation"
                );
                return PipelineOutcome::AlreadyClaimed;
            }
            Err(e) => {
                tracing::error!(project_id = %record.id, error = %e, "Failed to claim record");
                return PipelineOutcome::Failed {
                    message: e.to_string(),
                };
            }
        }

        match self.run(&event, &path, &record).await {
            Ok(processed_url) => {
                match self
                    .store
                    .transition(
                        &path.owner_id,
                        &record.id,
                        StatusUpdate::completed(processed_url.clone()),
                    )
                    .await
                {
                    Ok(_) => {
                        tracing::info!(
                            project_id = %record.id,
                            processed_url = %processed_url,
                            "Processing complete"
                        );
                        PipelineOutcome::Completed { processed_url }
                    }
                    Err(StoreError::Conflict { actual, .. }) => {
                        tracing::warn!(
                            project_id = %record.id,
                            status = %actual,
                            "Record reached a terminal state elsewhere; dropping result"
                        );
                        PipelineOutcome::AlreadyClaimed
                    }
                    Err(e) => {
                        tracing::error!(
                            project_id = %record.id,
                            error = %e,
                            "Failed to mark record completed"
                        );
                        PipelineOutcome::Failed {
                            message: e.to_string(),
                        }
                    }
                }
            }
            Err(e) => self.fail_record(&path.owner_id, &record.id, e).await,
        }
    }

    /// Event filter: only image objects inside an `uploads` folder are in
    /// scope. Everything else is a silent no-op.
    fn filter(&self, event: &StorageEvent) -> Option<UploadPath> {
        if !event.accepts() {
            tracing::info!(
                object_path = %event.object_path,
                content_type = ?event.content_type,
                "Ignoring out-of-scope storage event"
            );
            return None;
        }
        UploadPath::parse(&event.object_path)
    }

    /// Steps 4–6: fetch input, run the selected strategy, write the
    /// artifact. Returns the artifact's public URL.
    async fn run(
        &self,
        event: &StorageEvent,
        path: &UploadPath,
        record: &ProjectRecord,
    ) -> Result<String, PipelineError> {
        let input = self.storage.download(&event.object_path).await?;

        let user_prompt = event.user_prompt();
        let strategy = select_strategy(
            &self.config,
            self.inference.clone(),
            self.processor.clone(),
            user_prompt,
        );

        tracing::info!(
            project_id = %record.id,
            strategy = strategy.name(),
            input_bytes = input.len(),
            "Running synthesis strategy"
        );

        let ctx = StrategyContext {
            user_prompt: user_prompt.map(str::to_string),
            record: record.clone(),
        };
        let output = strategy.process(&input, &ctx).await?;

        // Result keys prefer the project id; the file stem only carries
        // correlation for records resolved through the path fallback.
        let stem = if event.project_id().is_some() {
            record.id.clone()
        } else {
            path.file_stem().to_string()
        };

        self.artifacts.write(&path.owner_id, &stem, output).await
    }

    /// Best-effort terminal `error` update.
    async fn fail_record(
        &self,
        owner_id: &str,
        project_id: &str,
        error: PipelineError,
    ) -> PipelineOutcome {
        let message = error.record_message();
        tracing::error!(
            project_id = %project_id,
            error = %error,
            "Pipeline failed; marking record errored"
        );

        match self
            .store
            .transition(owner_id, project_id, StatusUpdate::errored(message.clone()))
            .await
        {
            Ok(_) => {}
            Err(StoreError::Conflict { actual, .. }) => {
                tracing::warn!(
                    project_id = %project_id,
                    status = %actual,
                    "Record reached a terminal state elsewhere; error update dropped"
                );
                return PipelineOutcome::AlreadyClaimed;
            }
            Err(e) => {
                tracing::error!(
                    project_id = %project_id,
                    error = %e,
                    "Failed to mark record errored"
                );
            }
        }

        PipelineOutcome::Failed { message }
    }
}
