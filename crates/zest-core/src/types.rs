//! Wire-level request and result types.
//!
//! Field names match the JSON envelope exchanged with the web layer, so a
//! transport that serializes these types stays byte-compatible with it.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::normalizer::NormalizedOutput;

/// User id recorded for requests that arrive without one.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Desired shape of the generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// A page plus a separate stylesheet
    #[default]
    HtmlCss,

    /// A page styled with Tailwind utility classes, usually no stylesheet
    Tailwind,
}

impl OutputFormat {
    /// Wire name of the format.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::HtmlCss => "html_css",
            OutputFormat::Tailwind => "tailwind",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "html_css" => Ok(OutputFormat::HtmlCss),
            "tailwind" => Ok(OutputFormat::Tailwind),
            other => Err(format!(
                "unknown output format '{}': expected 'html_css' or 'tailwind'",
                other
            )),
        }
    }
}

impl Serialize for OutputFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// Missing, null and "" all mean html_css.
impl<'de> Deserialize<'de> for OutputFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(OutputFormat::HtmlCss),
            Some(s) => s.parse().map_err(de::Error::custom),
        }
    }
}

/// Refinement targeting metadata.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationContext {
    /// Generation this request refines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_generation_id: Option<String>,

    /// System instruction override set for refinements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refinement_target: Option<String>,

    /// Current page markup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_html: Option<String>,

    /// Current stylesheet, empty for Tailwind pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_css: Option<String>,
}

/// Output format and style hints.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationPreferences {
    #[serde(default)]
    pub output_format: OutputFormat,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_hints: Option<String>,
}

/// A generation (or refinement) request as received from the web layer.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationRequest {
    #[serde(default)]
    pub request_id: String,

    /// "anonymous" when unauthenticated
    #[serde(default)]
    pub user_id: String,

    pub prompt: String,

    #[serde(default)]
    pub context: GenerationContext,

    #[serde(default)]
    pub preferences: GenerationPreferences,

    /// Provider to try first, e.g. "gemini"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_provider: Option<String>,

    /// Model to use on the preferred provider, e.g. "gemini-2.5-pro"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_model: Option<String>,
}

impl GenerationRequest {
    /// Create a request carrying only a prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Pin a provider (and optionally a model on it).
    pub fn with_preferred_provider(
        mut self,
        provider: impl Into<String>,
        model: Option<String>,
    ) -> Self {
        self.preferred_provider = Some(provider.into());
        self.preferred_model = model;
        self
    }

    /// Fill in a fresh request id and the anonymous user when absent.
    pub fn with_defaults(mut self) -> Self {
        if self.request_id.is_empty() {
            self.request_id = Uuid::new_v4().to_string();
        }
        if self.user_id.is_empty() {
            self.user_id = ANONYMOUS_USER.to_string();
        }
        self
    }

    /// True when the prompt has already been scoped for a refinement.
    pub fn is_refinement(&self) -> bool {
        self.refinement_override().is_some()
    }

    /// System instruction that replaces the backend default, if any.
    pub fn refinement_override(&self) -> Option<&str> {
        self.context
            .refinement_target
            .as_deref()
            .filter(|s| !s.is_empty())
    }

    /// Preferred provider name, ignoring empty strings from the wire.
    pub fn preferred_provider(&self) -> Option<&str> {
        self.preferred_provider
            .as_deref()
            .filter(|s| !s.is_empty())
    }

    /// Model pinned for `provider`, honoured only when that provider is preferred.
    pub fn model_for(&self, provider: &str) -> Option<&str> {
        match self.preferred_provider() {
            Some(name) if name == provider => {
                self.preferred_model.as_deref().filter(|s| !s.is_empty())
            }
            _ => None,
        }
    }

    /// Style hints, ignoring blank values.
    pub fn style_hints(&self) -> Option<&str> {
        self.preferences
            .style_hints
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }

    pub fn output_format(&self) -> OutputFormat {
        self.preferences.output_format
    }
}

/// Outcome status reported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Success,
    Error,
}

/// The normalized response returned to the web layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationResult {
    pub generation_id: String,
    pub status: GenerationStatus,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub css: String,
    #[serde(default)]
    pub provider_used: String,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationResult {
    /// A successful result with a fresh generation id.
    pub fn success(
        output: NormalizedOutput,
        provider_used: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            generation_id: Uuid::new_v4().to_string(),
            status: GenerationStatus::Success,
            html: output.html,
            css: output.css,
            provider_used: provider_used.into(),
            duration_ms,
            error: None,
        }
    }

    /// A failed result with a fresh generation id.
    pub fn error(message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            generation_id: Uuid::new_v4().to_string(),
            status: GenerationStatus::Error,
            html: String::new(),
            css: String::new(),
            provider_used: String::new(),
            duration_ms,
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == GenerationStatus::Success
    }
}

/// Payload for a standalone moderation pre-check.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModerationRequest {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub prompt: String,
}

/// Result of a standalone moderation pre-check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModerationResult {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Standardized error payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
