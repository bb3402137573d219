//! Test support: scripted inference client and response builders.
//!
//! Lives as ordinary library code so both unit tests and the integration
//! suites can share one fake without duplicating it per crate.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use backdrop_inference::{
    image_value, InferenceClient, InferenceError, PredictResponse, StructuredValue,
};

/// One recorded `predict` invocation.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub endpoint_id: String,
    pub instance: StructuredValue,
    pub parameters: StructuredValue,
}

/// Inference client that replays scripted responses per endpoint and records
/// every call it receives.
#[derive(Default)]
pub struct ScriptedInferenceClient {
    responses: Mutex<HashMap<String, VecDeque<Result<PredictResponse, String>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedInferenceClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next response for `endpoint_id`.
    pub fn enqueue(&self, endpoint_id: &str, response: PredictResponse) {
        self.responses
            .lock()
            .unwrap()
            .entry(endpoint_id.to_string())
            .or_default()
            .push_back(Ok(response));
    }

    /// Queue a transport failure for `endpoint_id`.
    pub fn enqueue_error(&self, endpoint_id: &str, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .entry(endpoint_id.to_string())
            .or_default()
            .push_back(Err(message.to_string()));
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceClient for ScriptedInferenceClient {
    async fn predict(
        &self,
        endpoint_id: &str,
        instance: StructuredValue,
        parameters: StructuredValue,
    ) -> Result<PredictResponse, InferenceError> {
        self.calls.lock().unwrap().push(RecordedCall {
            endpoint_id: endpoint_id.to_string(),
            instance,
            parameters,
        });

        let next = self
            .responses
            .lock()
            .unwrap()
            .get_mut(endpoint_id)
            .and_then(VecDeque::pop_front);

        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(InferenceError::Transport(message)),
            None => Err(InferenceError::Transport(format!(
                "no scripted response for endpoint {}",
                endpoint_id
            ))),
        }
    }
}

/// A response carrying one image prediction.
pub fn image_response(data: &[u8]) -> PredictResponse {
    PredictResponse {
        predictions: vec![image_value(data)],
    }
}

/// A response carrying one text prediction (vision analysis replies).
pub fn text_response(text: &str) -> PredictResponse {
    let mut map = BTreeMap::new();
    map.insert("text".to_string(), StructuredValue::from(text));
    PredictResponse {
        predictions: vec![StructuredValue::Map(map)],
    }
}
