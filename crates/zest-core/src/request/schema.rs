//! JSON Schema validation for generation requests.
//!
//! Requests are validated against schema/generation-request.schema.json.

use std::sync::OnceLock;
use thiserror::Error;

/// Embedded request schema (loaded at compile time).
const REQUEST_SCHEMA_JSON: &str =
    include_str!("../../../../schema/generation-request.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema loading.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),
}

fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = serde_json::from_str(REQUEST_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result
        .as_ref()
        .map_err(|e| SchemaError::LoadError(e.clone()))
}

/// Validate a request JSON value against the schema.
///
/// Returns every violation found, each suffixed with its instance path.
pub fn validate_request_schema(request_json: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(request_json)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_request_passes_schema() {
        let value = serde_json::json!({ "prompt": "A landing page" });
        assert!(validate_request_schema(&value).is_ok());
    }

    #[test]
    fn test_missing_prompt_fails() {
        let value = serde_json::json!({ "user_id": "u-1" });
        let errors = validate_request_schema(&value).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("prompt")));
    }

    #[test]
    fn test_wrong_types_fail() {
        let value = serde_json::json!({
            "prompt": 42,
            "preferences": { "output_format": "jsx" }
        });
        let errors = validate_request_schema(&value).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
