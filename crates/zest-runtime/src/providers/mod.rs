//! Generation backends.
//!
//! This module defines the capability every backend implements and
//! includes clients for Gemini, GLM and GitHub Copilot, each behind its
//! own cargo feature.
//!
//! ## Security
//!
//! All providers use the [`secrets`] module for credential handling.
//! See [`ApiCredential`] for the recommended patterns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use zest_core::GenerationRequest;

use crate::deadline::Deadline;

mod factory;
pub mod secrets;

#[cfg(feature = "reqwest")]
mod http;

#[cfg(any(feature = "glm", feature = "copilot"))]
mod openai_compat;

#[cfg(feature = "copilot")]
mod copilot;
#[cfg(feature = "gemini")]
mod gemini;
#[cfg(feature = "glm")]
mod glm;

pub use factory::{ProviderFactory, ProviderRegistry};
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "copilot")]
pub use copilot::{CopilotProvider, CopilotProviderFactory, COPILOT_TOKEN_ENV};
#[cfg(feature = "gemini")]
pub use gemini::{GeminiProvider, GeminiProviderFactory, GEMINI_API_KEY_ENV};
#[cfg(feature = "glm")]
pub use glm::{GlmProvider, GlmProviderFactory, GLM_API_KEY_ENV};

/// Errors from a single backend call.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Empty response: {0}")]
    EmptyResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// A single model served by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// e.g. "gemini-2.5-flash"
    pub id: String,

    /// e.g. "Gemini 2.5 Flash"
    pub display_name: String,

    /// Canonical provider name
    pub provider: String,
}

impl ModelInfo {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            provider: provider.into(),
        }
    }
}

/// Catalog entry for one configured provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    pub enabled: bool,
    pub models: Vec<ModelInfo>,
}

/// Capability every generation backend implements.
///
/// The router depends only on this trait. Implementations must be safe to
/// call concurrently; any mutable state (e.g. a cached session token) is
/// synchronized inside the implementation.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Canonical provider name, e.g. "gemini".
    fn name(&self) -> &str;

    /// True when the backend is configured (credentials present).
    fn enabled(&self) -> bool;

    /// Static model catalog.
    fn models(&self) -> Vec<ModelInfo>;

    /// Produce raw text for a request before `deadline`.
    async fn generate(
        &self,
        deadline: &Deadline,
        request: &GenerationRequest,
    ) -> Result<String, ProviderError>;

    /// Catalog entry for the models listing.
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.name().to_string(),
            enabled: self.enabled(),
            models: self.models(),
        }
    }
}
