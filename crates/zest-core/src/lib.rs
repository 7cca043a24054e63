//! # zest-core
//!
//! Deterministic building blocks of the Zest generation gateway.
//!
//! This crate answers three questions for every generation request:
//! - May this prompt be sent to a backend at all?
//! - What exactly should the backend be asked?
//! - How does a free-form backend reply become an (HTML, CSS) pair?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces same output
//! 2. **No network calls**: Backends live in `zest-runtime`
//! 3. **Total normalization**: Parsing a reply never fails
//! 4. **Shareable**: Every component is immutable after construction
//!
//! ## Example
//!
//! ```rust
//! use zest_core::{normalizer, ContentModerator, DenylistModerator, OutputFormat};
//!
//! let moderator = DenylistModerator::default();
//! assert!(moderator.check("A landing page for a bakery").allowed);
//!
//! let output = normalizer::parse("Hello", OutputFormat::HtmlCss);
//! assert_eq!(output.html, "<html><body><p>Hello</p></body></html>");
//! assert!(output.css.is_empty());
//! ```

pub mod moderation;
pub mod normalizer;
pub mod prompts;
pub mod request;
pub mod types;

// Re-export main types at crate root
pub use moderation::{ContentModerator, Decision, DenylistModerator, ModerationPolicy};
pub use normalizer::NormalizedOutput;
pub use prompts::{build_refinement_prompt, REFINEMENT_SYSTEM_PROMPT};
pub use request::{parse_generation_request, parse_moderation_request, RequestError};
pub use types::{
    ErrorResponse, GenerationContext, GenerationPreferences, GenerationRequest,
    GenerationResult, GenerationStatus, ModerationRequest, ModerationResult, OutputFormat,
};
