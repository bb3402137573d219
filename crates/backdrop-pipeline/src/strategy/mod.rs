//! Synthesis strategies
//!
//! One upload in, one processed raster out. Four variants call remote
//! prediction endpoints; the high-fidelity variant is fully local. The
//! orchestrator treats whichever strategy it selected as a single atomic
//! unit — a multi-stage strategy that fails half-way surfaces exactly one
//! error and no intermediate state.

pub mod copy;
pub mod direct_edit;
pub mod high_fidelity;
pub mod segment_inpaint;
pub mod vision_guided;

use std::sync::Arc;

use async_trait::async_trait;
use backdrop_core::config::{Config, PromptStrategy};
use backdrop_core::models::ProjectRecord;
use backdrop_inference::InferenceClient;
use backdrop_processing::HighFidelityProcessor;

use crate::error::PipelineError;

pub use copy::CopyOnly;
pub use direct_edit::DirectEdit;
pub use high_fidelity::HighFidelity;
pub use segment_inpaint::SegmentThenInpaint;
pub use vision_guided::{ProductAnalysis, VisionGuidedGenerate};

/// Fixed prompt for background replacement when the user supplied no
/// creative direction of their own.
pub(crate) const STUDIO_EDIT_PROMPT: &str = "Replace the background with a clean, seamless \
professional studio backdrop with soft, even lighting. Keep the product itself unchanged.";

/// Stage-A instruction for the vision analysis model.
pub(crate) const ANALYSIS_PROMPT: &str = "Describe the product in this photo and transcribe any \
text printed on it. Reply with a single JSON object with exactly two string fields, \
\"productDescription\" and \"extractedText\". Use an empty string for extractedText when the \
product carries no text.";

/// Appended to every generated synthesis prompt.
pub(crate) const QUALITY_SUFFIX: &str = "Professional product photography, studio lighting, \
high resolution, photorealistic.";

/// Per-invocation context handed to a strategy.
#[derive(Debug, Clone)]
pub struct StrategyContext {
    pub user_prompt: Option<String>,
    pub record: ProjectRecord,
}

/// One concrete algorithm turning an input image into the processed output.
#[async_trait]
pub trait SynthesisStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn process(
        &self,
        image: &[u8],
        ctx: &StrategyContext,
    ) -> Result<Vec<u8>, PipelineError>;
}

/// Pick the strategy for this invocation.
///
/// Uploads without a creative prompt always take the deterministic local
/// path; prompted uploads use whichever remote strategy the deployment
/// configured (quality/cost/latency tradeoff).
pub fn select_strategy(
    config: &Config,
    client: Arc<dyn InferenceClient>,
    processor: Arc<HighFidelityProcessor>,
    user_prompt: Option<&str>,
) -> Box<dyn SynthesisStrategy> {
    if user_prompt.is_none() {
        return Box::new(HighFidelity::new(processor));
    }

    match config.prompt_strategy {
        PromptStrategy::Copy => Box::new(CopyOnly),
        PromptStrategy::DirectEdit => Box::new(DirectEdit::new(
            client,
            config.edit_endpoint_id.clone(),
            config.aspect_ratio.clone(),
            config.edit_mode.clone(),
        )),
        PromptStrategy::SegmentInpaint => Box::new(SegmentThenInpaint::new(
            client,
            config.segmentation_endpoint_id.clone(),
            config.edit_endpoint_id.clone(),
            config.aspect_ratio.clone(),
        )),
        PromptStrategy::VisionGuided => Box::new(VisionGuidedGenerate::new(
            client,
            config.vision_endpoint_id.clone(),
            config.edit_endpoint_id.clone(),
            config.aspect_ratio.clone(),
            config.edit_mode.clone(),
        )),
    }
}
