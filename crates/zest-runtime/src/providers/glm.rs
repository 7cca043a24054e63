//! ZhipuAI GLM provider (OpenAI-compatible chat completions).

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use zest_core::GenerationRequest;

use super::{
    factory::{config_str, ProviderFactory},
    http,
    openai_compat::{send_chat, ChatRequest},
    secrets::{ApiCredential, CredentialSource},
    LlmProvider, ModelInfo, ProviderError,
};
use crate::deadline::Deadline;

/// Environment variable name for the GLM API key.
pub const GLM_API_KEY_ENV: &str = "GLM_API_KEY";

const PROVIDER_NAME: &str = "glm";
const DEFAULT_BASE_URL: &str = "https://api.z.ai/api/paas/v4";
const DEFAULT_MODEL: &str = "glm-4.5-air";

/// GLM provider.
pub struct GlmProvider {
    credential: Option<ApiCredential>,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlmProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl GlmProvider {
    /// Create a provider with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            credential: Some(ApiCredential::new(
                api_key,
                CredentialSource::Programmatic,
                "GLM API key",
            )),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            client: http::build_client()?,
        })
    }

    /// Create from JSON configuration with `GLM_API_KEY` fallback.
    /// Without a key the provider is built disabled.
    pub fn from_config(config: &JsonValue) -> Result<Self, ProviderError> {
        Ok(Self {
            credential: ApiCredential::optional_from_config_or_env(
                config,
                "api_key",
                GLM_API_KEY_ENV,
                "GLM API key",
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

#[async_trait]
impl LlmProvider for GlmProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn enabled(&self) -> bool {
        self.credential.as_ref().is_some_and(|c| !c.is_empty())
    }

    fn models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo::new("glm-4.5-air", "GLM-4.5 Air", PROVIDER_NAME),
            ModelInfo::new("glm-4.5", "GLM-4.5", PROVIDER_NAME),
        ]
    }

    async fn generate(
        &self,
        deadline: &Deadline,
        request: &GenerationRequest,
    ) -> Result<String, ProviderError> {
        let credential = self.credential.as_ref().ok_or_else(|| {
            ProviderError::NotConfigured(format!("{} not set", GLM_API_KEY_ENV))
        })?;

        let model = request.model_for(PROVIDER_NAME).unwrap_or(&self.model);
        let body = ChatRequest::for_generation(model, request);
        let url = format!("{}/chat/completions", self.base_url);

        // SECURITY: Only expose the credential here, at the point of use
        send_chat(
            &self.client,
            PROVIDER_NAME,
            &url,
            credential.expose(),
            &[],
            &body,
            deadline,
        )
        .await
    }
}

/// Factory for GLM providers.
///
/// ## Configuration Format
/// ```yaml
/// - type: glm
///   api_key: "..."            # Optional, falls back to GLM_API_KEY env
///   base_url: "https://..."   # Optional
///   model: glm-4.5-air        # Optional default model
/// ```
pub struct GlmProviderFactory;

impl ProviderFactory for GlmProviderFactory {
    fn provider_type(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(Arc::new(GlmProvider::from_config(config)?))
    }

    fn default_config(&self) -> JsonValue {
        serde_json::json!({ "model": DEFAULT_MODEL, "base_url": DEFAULT_BASE_URL })
    }

    fn description(&self) -> &'static str {
        "ZhipuAI GLM via OpenAI-compatible chat completions"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_catalog() {
        let provider = GlmProvider::new("test-key").unwrap();
        assert_eq!(provider.name(), "glm");
        assert!(provider.enabled());
        assert!(provider.models().iter().all(|m| m.provider == "glm"));
    }

    #[test]
    fn test_from_config_overrides() {
        let config = serde_json::json!({
            "api_key": "config-key",
            "base_url": "https://proxy.example.com/v4/",
            "model": "glm-4.5"
        });
        let provider = GlmProvider::from_config(&config).unwrap();
        assert_eq!(provider.base_url, "https://proxy.example.com/v4");
        assert_eq!(provider.model, "glm-4.5");
        assert_eq!(provider.credential.unwrap().source(), CredentialSource::Config);
    }

    #[test]
    fn test_empty_key_is_disabled() {
        let provider = GlmProvider::new("").unwrap();
        assert!(!provider.enabled());
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let secret_key = "glm-super-secret-key-12345";
        let provider = GlmProvider::new(secret_key).unwrap();
        let debug_output = format!("{:?}", provider);
        assert!(!debug_output.contains(secret_key));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn test_factory() {
        let factory = GlmProviderFactory;
        assert_eq!(factory.provider_type(), "glm");
        assert_eq!(factory.default_config()["model"], "glm-4.5-air");
        assert!(factory
            .validate_config(&serde_json::json!({ "base_url": "invalid-url" }))
            .is_err());
    }
}
