use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use backdrop_inference::{
    first_image_payload, image_value, parse_json_reply, text_payload, InferenceClient,
    StructuredValue,
};
use serde::Deserialize;

use crate::error::PipelineError;
use crate::strategy::{StrategyContext, SynthesisStrategy, ANALYSIS_PROMPT, QUALITY_SUFFIX};

/// What the vision model extracted from the upload.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProductAnalysis {
    pub product_description: String,
    pub extracted_text: String,
}

/// Two stages of different kind: a multimodal vision model describes the
/// product, then a generation/edit call synthesizes the new scene from that
/// description plus the user's creative direction.
pub struct VisionGuidedGenerate {
    client: Arc<dyn InferenceClient>,
    vision_endpoint_id: String,
    edit_endpoint_id: String,
    aspect_ratio: String,
    edit_mode: Option<String>,
}

impl VisionGuidedGenerate {
    pub fn new(
        client: Arc<dyn InferenceClient>,
        vision_endpoint_id: String,
        edit_endpoint_id: String,
        aspect_ratio: String,
        edit_mode: Option<String>,
    ) -> Self {
        Self {
            client,
            vision_endpoint_id,
            edit_endpoint_id,
            aspect_ratio,
            edit_mode,
        }
    }

    async fn analyze(&self, image: &[u8]) -> Result<ProductAnalysis, PipelineError> {
        let mut instance = BTreeMap::new();
        instance.insert("image".to_string(), image_value(image));
        instance.insert("prompt".to_string(), StructuredValue::from(ANALYSIS_PROMPT));

        let response = self
            .client
            .predict(
                &self.vision_endpoint_id,
                StructuredValue::Map(instance),
                StructuredValue::Map(BTreeMap::new()),
            )
            .await?;

        let reply = text_payload(&response)?;
        let parsed = parse_json_reply(reply)?;
        let analysis: ProductAnalysis = serde_json::from_value(parsed)
            .map_err(|e| PipelineError::Parse(format!("Analysis reply shape invalid: {}", e)))?;

        tracing::debug!(
            description_len = analysis.product_description.len(),
            has_text = !analysis.extracted_text.is_empty(),
            "Vision analysis parsed"
        );

        Ok(analysis)
    }

    /// Combine the user's creative direction with what the vision stage saw.
    fn build_prompt(&self, user_prompt: Option<&str>, analysis: &ProductAnalysis) -> String {
        let mut parts = Vec::new();
        if let Some(prompt) = user_prompt {
            parts.push(prompt.to_string());
        }
        parts.push(format!("The product: {}.", analysis.product_description));
        if !analysis.extracted_text.is_empty() {
            parts.push(format!(
                "Keep the text \"{}\" on the product legible and unaltered.",
                analysis.extracted_text
            ));
        }
        parts.push(QUALITY_SUFFIX.to_string());
        parts.join(" ")
    }

    async fn generate(&self, image: &[u8], prompt: &str) -> Result<Vec<u8>, PipelineError> {
        let mut instance = BTreeMap::new();
        instance.insert("prompt".to_string(), StructuredValue::from(prompt));
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
                &self.edit_endpoint_id,
                StructuredValue::Map(instance),
                StructuredValue::Map(parameters),
            )
            .await?;

        Ok(first_image_payload(&response)?)
    }
}

#[async_trait]
impl SynthesisStrategy for VisionGuidedGenerate {
    fn name(&self) -> &'static str {
        "vision_guided_generate"
    }

    async fn process(
        &self,
        image: &[u8],
        ctx: &StrategyContext,
    ) -> Result<Vec<u8>, PipelineError> {
        let analysis = self.analyze(image).await?;
        let prompt = self.build_prompt(ctx.user_prompt.as_deref(), &analysis);
        self.generate(image, &prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{image_response, text_response, ScriptedInferenceClient};
    use backdrop_core::models::ProjectRecord;

    const ANALYSIS_JSON: &str =
        r#"{"productDescription": "matte black water bottle", "extractedText": "HYDRA"}"#;

    fn ctx(prompt: Option<&str>) -> StrategyContext {
        StrategyContext {
            user_prompt: prompt.map(str::to_string),
            record: ProjectRecord::new_pending("p1", "u1", "n", "path", "url"),
        }
    }

    fn strategy(client: Arc<ScriptedInferenceClient>) -> VisionGuidedGenerate {
        VisionGuidedGenerate::new(
            client,
            "vision-analysis".to_string(),
            "image-edit".to_string(),
            "1:1".to_string(),
            Some("background-swap".to_string()),
        )
    }

    #[tokio::test]
    async fn test_two_stage_flow() {
        let client = Arc::new(ScriptedInferenceClient::new());
        client
            .enqueue("vision-analysis", text_response(ANALYSIS_JSON));
        client.enqueue("image-edit", image_response(b"final"));

        let out = strategy(client.clone())
            .process(b"upload", &ctx(Some("on a mountain ledge")))
            .await
            .unwrap();
        assert_eq!(out, b"final".to_vec());

        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].endpoint_id, "vision-analysis");
        assert_eq!(calls[0].instance.get_str("prompt"), Some(ANALYSIS_PROMPT));

        let prompt = calls[1].instance.get_str("prompt").unwrap();
        assert!(prompt.starts_with("on a mountain ledge"));
        assert!(prompt.contains("matte black water bottle"));
        assert!(prompt.contains("HYDRA"));
        assert!(prompt.ends_with(QUALITY_SUFFIX));
        assert_eq!(
            calls[1].parameters.get_str("editMode"),
            Some("background-swap")
        );
    }

    #[tokio::test]
    async fn test_fenced_analysis_reply_is_accepted() {
        let client = Arc::new(ScriptedInferenceClient::new());
        client
            .enqueue(
                "vision-analysis",
                text_response(&format!("```json\n{}\n```", ANALYSIS_JSON)),
            );
        client.enqueue("image-edit", image_response(b"final"));

        let out = strategy(client)
            .process(b"upload", &ctx(None))
            .await
            .unwrap();
        assert_eq!(out, b"final".to_vec());
    }

    #[tokio::test]
    async fn test_malformed_analysis_reply_is_parse_error() {
        let client = Arc::new(ScriptedInferenceClient::new());
        client
            .enqueue("vision-analysis", text_response("the bottle is black"));

        let err = strategy(client.clone())
            .process(b"upload", &ctx(None))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
        // No generation call after a failed analysis.
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_analysis_missing_field_is_parse_error() {
        let client = Arc::new(ScriptedInferenceClient::new());
        client
            .enqueue(
                "vision-analysis",
                text_response(r#"{"productDescription": "bottle"}"#),
            );

        let err = strategy(client)
            .process(b"upload", &ctx(None))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
    }

    #[tokio::test]
    async fn test_empty_extracted_text_omitted_from_prompt() {
        let client = Arc::new(ScriptedInferenceClient::new());
        client
            .enqueue(
                "vision-analysis",
                text_response(r#"{"productDescription": "bottle", "extractedText": ""}"#),
            );
        client.enqueue("image-edit", image_response(b"final"));

        strategy(client.clone())
            .process(b"upload", &ctx(None))
            .await
            .unwrap();

        let prompt = client.calls()[1].instance.get_str("prompt").unwrap().to_string();
        assert!(!prompt.contains("Keep the text"));
    }
}
