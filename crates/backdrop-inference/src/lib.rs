//! Inference client and wire-value codec
//!
//! One request, one response against a remote prediction endpoint, plus the
//! [`StructuredValue`] codec that keeps the dynamic wire format contained at
//! this boundary. No retries, no caching; callers above this crate work with
//! typed values only.

pub mod client;
pub mod reply;
pub mod value;

pub use client::{
    first_image_payload, image_value, text_payload, HttpInferenceClient, InferenceClient,
    InferenceError, PredictResponse,
};
pub use reply::{parse_json_reply, ReplyParseError};
pub use value::StructuredValue;
