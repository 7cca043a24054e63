//! Request envelope parsing and validation.
//!
//! Generation requests arrive as JSON, are validated against an embedded
//! JSON Schema, then deserialized into [`GenerationRequest`](crate::GenerationRequest).

mod parser;
mod schema;

pub use parser::{parse_generation_request, parse_moderation_request, RequestError};
pub use schema::validate_request_schema;
