use async_trait::async_trait;

use crate::error::PipelineError;
use crate::strategy::{StrategyContext, SynthesisStrategy};

/// Pass-through baseline: the "result" is the upload itself. Kept as a
/// placeholder mode for deployments without any inference backend.
pub struct CopyOnly;

#[async_trait]
impl SynthesisStrategy for CopyOnly {
    fn name(&self) -> &'static str {
        "copy_only"
    }

    async fn process(
        &self,
        image: &[u8],
        _ctx: &StrategyContext,
    ) -> Result<Vec<u8>, PipelineError> {
        Ok(image.to_vec())
    }
}
