use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use backdrop_inference::{first_image_payload, image_value, InferenceClient, StructuredValue};

use crate::error::PipelineError;
use crate::strategy::{StrategyContext, SynthesisStrategy, STUDIO_EDIT_PROMPT};

/// Two sequential calls: a salient-object segmentation produces a mask, and
/// an inpainting edit regenerates everything the mask allows. The mask is
/// the only coupling between the calls.
pub struct SegmentThenInpaint {
    client: Arc<dyn InferenceClient>,
    segmentation_endpoint_id: String,
    edit_endpoint_id: String,
    aspect_ratio: String,
}

impl SegmentThenInpaint {
    pub fn new(
        client: Arc<dyn InferenceClient>,
        segmentation_endpoint_id: String,
        edit_endpoint_id: String,
        aspect_ratio: String,
    ) -> Self {
        Self {
            client,
            segmentation_endpoint_id,
            edit_endpoint_id,
            aspect_ratio,
        }
    }

    async fn segment(&self, image: &[u8]) -> Result<Vec<u8>, PipelineError> {
        let mut instance = BTreeMap::new();
        instance.insert("image".to_string(), image_value(image));

        let mut parameters = BTreeMap::new();
        parameters.insert(
            "segmentationType".to_string(),
            StructuredValue::from("salient_object"),
        );

        let response = self
            .client
            .predict(
                &self.segmentation_endpoint_id,
                StructuredValue::Map(instance),
                StructuredValue::Map(parameters),
            )
            .await?;

        Ok(first_image_payload(&response)?)
    }

    async fn inpaint(&self, image: &[u8], mask: &[u8]) -> Result<Vec<u8>, PipelineError> {
        let mut instance = BTreeMap::new();
        instance.insert(
            "prompt".to_string(),
            StructuredValue::from(STUDIO_EDIT_PROMPT),
        );
        instance.insert("image".to_string(), image_value(image));
        instance.insert("mask".to_string(), image_value(mask));

        let mut parameters = BTreeMap::new();
        parameters.insert("sampleCount".to_string(), StructuredValue::from(1i64));
        parameters.insert(
            "aspectRatio".to_string(),
            StructuredValue::from(self.aspect_ratio.as_str()),
        );
        parameters.insert("mode".to_string(), StructuredValue::from("inpainting"));

        let response = self
            .client
            .predict(
                &self.edit_endpoint_id,
                StructuredValue::Map(instance),
                StructuredValue::Map(parameters),
            )
            .await?;

        Ok(first_image_payload(&response)?)
    }
}

#[async_trait]
impl SynthesisStrategy for SegmentThenInpaint {
    fn name(&self) -> &'static str {
        "segment_then_inpaint"
    }

    async fn process(
        &self,
        image: &[u8],
        _ctx: &StrategyContext,
    ) -> Result<Vec<u8>, PipelineError> {
        let mask = self.segment(image).await?;
        tracing::debug!(mask_bytes = mask.len(), "Segmentation mask produced");
        self.inpaint(image, &mask).await
    }
}
