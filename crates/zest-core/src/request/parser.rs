//! Request parsing from JSON.

use thiserror::Error;

use super::schema::validate_request_schema;
use crate::types::{GenerationRequest, ModerationRequest};

/// Errors that can occur when parsing a request envelope.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("invalid request body: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("invalid request body: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),

    #[error("prompt is required")]
    MissingPrompt,
}

/// Parse and validate a generation request.
///
/// Rejects malformed JSON, schema violations and an empty prompt. Defaults
/// (request id, anonymous user) are not applied here.
pub fn parse_generation_request(json: &str) -> Result<GenerationRequest, RequestError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    validate_request_schema(&value).map_err(RequestError::SchemaViolation)?;

    let request: GenerationRequest = serde_json::from_value(value)?;
    if request.prompt.is_empty() {
        return Err(RequestError::MissingPrompt);
    }

    Ok(request)
}

/// Parse a moderation pre-check request. An empty prompt is left for the
/// moderator to reject.
pub fn parse_moderation_request(json: &str) -> Result<ModerationRequest, RequestError> {
    Ok(serde_json::from_str(json)?)
}
