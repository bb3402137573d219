use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use backdrop_inference::{first_image_payload, image_value, InferenceClient, StructuredValue};

use crate::error::PipelineError;
use crate::strategy::{StrategyContext, SynthesisStrategy, STUDIO_EDIT_PROMPT};

/// One call to the generation/edit endpoint with the fixed studio prompt.
pub struct DirectEdit {
    client: Arc<dyn InferenceClient>,
    endpoint_id: String,
    aspect_ratio: String,
    edit_mode: Option<String>,
}

impl DirectEdit {
    pub fn new(
        client: Arc<dyn InferenceClient>,
        endpoint_id: String,
        aspect_ratio: String,
        edit_mode: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint_id,
            aspect_ratio,
            edit_mode,
        }
    }
}

#[async_trait]
impl SynthesisStrategy for DirectEdit {
    fn name(&self) -> &'static str {
        "direct_edit"
    }

    async fn process(
        &self,
        image: &[u8],
        _ctx: &StrategyContext,
    ) -> Result<Vec<u8>, PipelineError> {
        let mut instance = BTreeMap::new();
        instance.insert(
            "prompt".to_string(),
            StructuredValue::from(STUDIO_EDIT_PROMPT),
        );
        instance.insert("image".to_string(), image_value(image));

        let mut parameters = BTreeMap::new();
        parameters.insert("sampleCount".to_string(), StructuredValue::from(1i64));
        parameters.insert(
            "aspectRatio".to_string(),
            StructuredValue::from(self.aspect_ratio.as_str()),
        );
        if let Some(mode) = &self.edit_mode {
            parameters.insert("editMode".to_string(), StructuredValue::from(mode.as_str()));
        }

        let response = self
            .client
            .predict(
                &self.endpoint_id,
                StructuredValue::Map(instance),
                StructuredValue::Map(parameters),
            )
            .await?;

        Ok(first_image_payload(&response)?)
    }
}
