//! Google Gemini provider (generativelanguage REST API).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use zest_core::{prompts, GenerationRequest};

use super::{
    factory::{config_str, ProviderFactory},
    http,
    secrets::{ApiCredential, CredentialSource},
    LlmProvider, ModelInfo, ProviderError,
};
use crate::deadline::Deadline;

/// Environment variable name for the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

const PROVIDER_NAME: &str = "gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const MAX_OUTPUT_TOKENS: u32 = 8192;

/// Gemini provider.
///
/// The key travels in the `x-goog-api-key` header, never in the URL.
pub struct GeminiProvider {
    credential: Option<ApiCredential>,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiProvider {
    /// Create a provider with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            credential: Some(ApiCredential::new(
                api_key,
                CredentialSource::Programmatic,
                "Gemini API key",
            )),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            client: http::build_client()?,
        })
    }

    /// Create from JSON configuration with `GEMINI_API_KEY` fallback.
    /// Without a key the provider is built disabled.
    pub fn from_config(config: &JsonValue) -> Result<Self, ProviderError> {
        Ok(Self {
            credential: ApiCredential::optional_from_config_or_env(
                config,
                "api_key",
                GEMINI_API_KEY_ENV,
                "Gemini API key",
            ),
            base_url: config_str(config, "base_url", DEFAULT_BASE_URL),
            model: config_str(config, "model", DEFAULT_MODEL),
            client: http::build_client()?,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// generateContent request body.
#[derive(Debug, Serialize)]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiRequest {
    fn for_generation(request: &GenerationRequest) -> Self {
        Self {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: prompts::system_prompt(request).to_string(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: prompts::user_prompt(request),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: 0.7,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        }
    }
}

/// generateContent response body.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

impl GeminiResponse {
    /// Text of the first part of the first candidate.
    fn into_text(self) -> Result<String, ProviderError> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| ProviderError::EmptyResponse("gemini: empty candidates".to_string()))
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn enabled(&self) -> bool {
        self.credential.as_ref().is_some_and(|c| !c.is_empty())
    }

    fn models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo::new("gemini-2.5-flash", "Gemini 2.5 Flash", PROVIDER_NAME),
            ModelInfo::new("gemini-2.5-pro", "Gemini 2.5 Pro", PROVIDER_NAME),
            ModelInfo::new("gemini-1.5-flash", "Gemini 1.5 Flash", PROVIDER_NAME),
        ]
    }

    async fn generate(
        &self,
        deadline: &Deadline,
        request: &GenerationRequest,
    ) -> Result<String, ProviderError> {
        let credential = self.credential.as_ref().ok_or_else(|| {
            ProviderError::NotConfigured(format!("{} not set", GEMINI_API_KEY_ENV))
        })?;

        let model = request.model_for(PROVIDER_NAME).unwrap_or(&self.model);
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let body = GeminiRequest::for_generation(request);
        let timeout = http::call_timeout(deadline)?;

        // SECURITY: Only expose the credential here, at the point of use
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", credential.expose())
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| http::send_error(e, timeout))?;

        if !response.status().is_success() {
            return Err(http::status_error(response).await);
        }

        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        body.into_text()
    }
}

/// Factory for Gemini providers.
///
/// ## Configuration Format
/// ```yaml
/// - type: gemini
///   api_key: "..."            # Optional, falls back to GEMINI_API_KEY env
///   base_url: "https://..."   # Optional
///   model: gemini-2.5-flash   # Optional default model
/// ```
pub struct GeminiProviderFactory;

impl ProviderFactory for GeminiProviderFactory {
    fn provider_type(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(Arc::new(GeminiProvider::from_config(config)?))
    }

    fn default_config(&self) -> JsonValue {
        serde_json::json!({ "model": DEFAULT_MODEL, "base_url": DEFAULT_BASE_URL })
    }

    fn description(&self) -> &'static str {
        "Google Gemini via the generativelanguage API"
    }
}
