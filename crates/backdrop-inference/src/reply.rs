//! Tolerant parser for model text replies
//!
//! Vision models asked for JSON frequently wrap the object in a markdown
//! code fence. This strips at most one fence pair and parses; anything still
//! malformed is an error, never a silently substituted default.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplyParseError {
    #[error("Reply is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Parse a model text reply as JSON, stripping one ```json or bare ```
/// fence pair if present.
pub fn parse_json_reply(text: &str) -> Result<serde_json::Value, ReplyParseError> {
    let stripped = if text.contains("```json") {
        text.split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(text)
    } else if text.contains("```") {
        text.split("```")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(text)
    } else {
        text
    };

    Ok(serde_json::from_str(stripped.trim())?)
}
