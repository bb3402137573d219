//! Pipeline error taxonomy
//!
//! Everything that can abort an invocation after event validation. Each
//! failure is caught exactly once at the orchestrator boundary and turned
//! into a best-effort `error` status update; out-of-scope events are not
//! errors at all (see [`crate::orchestrator::PipelineOutcome::Skipped`]).

use backdrop_db::StoreError;
use backdrop_inference::{InferenceError, ReplyParseError};
use backdrop_processing::ProcessingError;
use backdrop_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Project record not found: {0}")]
    NotFound(String),

    #[error("Inference call failed: {0}")]
    Upstream(#[from] InferenceError),

    #[error("Vision analysis reply unusable: {0}")]
    Parse(String),

    #[error("Local processing failed: {0}")]
    LocalProcessing(#[from] ProcessingError),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Record store operation failed: {0}")]
    Store(#[from] StoreError),
}

impl From<ReplyParseError> for PipelineError {
    fn from(err: ReplyParseError) -> Self {
        PipelineError::Parse(err.to_string())
    }
}

impl PipelineError {
    /// The human-readable message written into the record's `error` field.
    pub fn record_message(&self) -> String {
        self.to_string()
    }
}
