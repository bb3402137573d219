use std::sync::Arc;

use async_trait::async_trait;
use backdrop_processing::HighFidelityProcessor;

use crate::error::PipelineError;
use crate::strategy::{StrategyContext, SynthesisStrategy};

/// The deterministic local path: segmentation plus solid-backdrop
/// compositing, no network involved. Default for uploads without a creative
/// prompt.
pub struct HighFidelity {
    processor: Arc<HighFidelityProcessor>,
}

impl HighFidelity {
    pub fn new(processor: Arc<HighFidelityProcessor>) -> Self {
        Self { processor }
    }
}

#[async_trait]
impl SynthesisStrategy for HighFidelity {
    fn name(&self) -> &'static str {
        "high_fidelity"
    }

    async fn process(
        &self,
        image: &[u8],
        _ctx: &StrategyContext,
    ) -> Result<Vec<u8>, PipelineError> {
        Ok(self.processor.process(image)?)
    }
}
