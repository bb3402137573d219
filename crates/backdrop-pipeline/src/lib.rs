//! Backdrop processing pipeline
//!
//! The unit of work behind every upload: validate the storage-finalize
//! event, resolve the project record (tolerating eventual consistency),
//! run one synthesis strategy, persist the artifact, and drive the record's
//! status state machine to a terminal state. All dependencies are injected
//! through [`Pipeline::new`]; there is no process-global state.

pub mod artifact;
pub mod error;
pub mod orchestrator;
pub mod resolver;
pub mod strategy;
pub mod testing;

pub use artifact::ArtifactWriter;
pub use error::PipelineError;
pub use orchestrator::{Pipeline, PipelineOutcome};
pub use strategy::{select_strategy, StrategyContext, SynthesisStrategy};
