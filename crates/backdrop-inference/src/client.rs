//! Prediction endpoint client
//!
//! `predict` sends one request and returns one response; failure handling,
//! chaining, and retries (there are none) belong to the caller.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use thiserror::Error;

use crate::value::StructuredValue;

const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Inference call errors
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Endpoint returned no predictions")]
    EmptyPredictions,

    #[error("Prediction missing expected field: {0}")]
    MissingPayload(&'static str),

    #[error("Invalid base64 image payload: {0}")]
    InvalidPayload(String),
}

/// Response of one prediction call.
#[derive(Debug, Clone)]
pub struct PredictResponse {
    pub predictions: Vec<StructuredValue>,
}

/// One-shot prediction client. Stateless; no retry, no caching.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn predict(
        &self,
        endpoint_id: &str,
        instance: StructuredValue,
        parameters: StructuredValue,
    ) -> Result<PredictResponse, InferenceError>;
}

/// HTTP implementation against a `{base_url}/{endpoint_id}:predict` API.
pub struct HttpInferenceClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPredictResponse {
    #[serde(default)]
    predictions: Vec<serde_json::Value>,
}

impl HttpInferenceClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, InferenceError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                InferenceError::Transport(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn predict(
        &self,
        endpoint_id: &str,
        instance: StructuredValue,
        parameters: StructuredValue,
    ) -> Result<PredictResponse, InferenceError> {
        let url = format!(
            "{}/{}:predict",
            self.base_url.trim_end_matches('/'),
            endpoint_id
        );

        let body = serde_json::json!({
            "instances": [instance.to_json()],
            "parameters": parameters.to_json(),
        });

        let mut request = self
            .http_client
            .post(&url)
            .header("content-type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| InferenceError::Transport(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let raw: RawPredictResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Transport(format!("Undecodable response body: {}", e)))?;

        tracing::debug!(
            endpoint_id = %endpoint_id,
            predictions = raw.predictions.len(),
            "Prediction call completed"
        );

        Ok(PredictResponse {
            predictions: raw
                .predictions
                .iter()
                .map(StructuredValue::from_json)
                .collect(),
        })
    }
}

/// Wrap raw image bytes as the `{bytesBase64Encoded}` payload the prediction
/// wire format expects.
pub fn image_value(data: &[u8]) -> StructuredValue {
    let mut map = BTreeMap::new();
    map.insert(
        "bytesBase64Encoded".to_string(),
        StructuredValue::String(base64::engine::general_purpose::STANDARD.encode(data)),
    );
    StructuredValue::Map(map)
}

/// Extract and decode the image payload of a single prediction.
pub fn image_payload(prediction: &StructuredValue) -> Result<Vec<u8>, InferenceError> {
    let encoded = prediction
        .get_str("bytesBase64Encoded")
        .filter(|s| !s.is_empty())
        .ok_or(InferenceError::MissingPayload("bytesBase64Encoded"))?;

    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| InferenceError::InvalidPayload(e.to_string()))
}

/// Extract the image payload of the first prediction; zero predictions and
/// missing payloads are both fatal.
pub fn first_image_payload(response: &PredictResponse) -> Result<Vec<u8>, InferenceError> {
    let prediction = response
        .predictions
        .first()
        .ok_or(InferenceError::EmptyPredictions)?;
    image_payload(prediction)
}

/// Extract the text reply of the first prediction (vision analysis calls).
pub fn text_payload(response: &PredictResponse) -> Result<&str, InferenceError> {
    let prediction = response
        .predictions
        .first()
        .ok_or(InferenceError::EmptyPredictions)?;
    prediction
        .get_str("text")
        .ok_or(InferenceError::MissingPayload("text"))
}
