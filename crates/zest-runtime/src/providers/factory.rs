//! Provider factory pattern for building backends from configuration.
//!
//! New backends are added by registering a factory, never by touching the
//! router.
//!
//! ## Usage
//!
//! ```ignore
//! let registry = ProviderRegistry::with_defaults();
//! let provider = registry.create("glm", &serde_json::json!({ "model": "glm-4.5" }))?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::{LlmProvider, ProviderError};

/// Factory for creating providers from configuration.
pub trait ProviderFactory: Send + Sync {
    /// Unique identifier for this provider type, e.g. "gemini".
    fn provider_type(&self) -> &'static str;

    /// Create a provider instance from JSON configuration.
    ///
    /// A missing credential is not an error: the provider is created and
    /// reports itself disabled.
    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError>;

    /// Validate configuration without creating a provider.
    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        validate_common_config(config)
    }

    /// Default configuration for this provider.
    fn default_config(&self) -> JsonValue {
        serde_json::json!({})
    }

    /// Human-readable description of this provider.
    fn description(&self) -> &'static str {
        "Generation provider"
    }
}

/// Checks shared by every backend: `base_url` must be an http(s) URL and
/// `api_key`/`model` must be strings when present.
pub(crate) fn validate_common_config(config: &JsonValue) -> Result<(), ProviderError> {
    if !config.is_null() && !config.is_object() {
        return Err(ProviderError::NotConfigured(
            "provider config must be a mapping".to_string(),
        ));
    }

    for key in ["api_key", "model", "base_url"] {
        if !config[key].is_null() && !config[key].is_string() {
            return Err(ProviderError::NotConfigured(format!(
                "'{}' must be a string",
                key
            )));
        }
    }

    if let Some(url) = config["base_url"].as_str() {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ProviderError::NotConfigured(
                "base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

/// String setting from config, or `default`.
#[allow(dead_code)] // unused when no backend feature is enabled
pub(crate) fn config_str(config: &JsonValue, key: &str, default: &str) -> String {
    config[key]
        .as_str()
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

/// Registry of available provider factories, keyed by type name.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider factory, replacing any with the same type.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        self.factories
            .insert(factory.provider_type().to_string(), factory);
    }

    /// Validate then create a provider from type name and configuration.
    pub fn create(
        &self,
        provider_type: &str,
        config: &JsonValue,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let factory = self.factories.get(provider_type).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "Unknown provider type: '{}'. Available: {:?}",
                provider_type,
                self.available_types()
            ))
        })?;

        factory.validate_config(config)?;
        factory.create(config)
    }

    /// Validate configuration for a provider type.
    pub fn validate(&self, provider_type: &str, config: &JsonValue) -> Result<(), ProviderError> {
        self.factories
            .get(provider_type)
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!("Unknown provider type: '{}'", provider_type))
            })?
            .validate_config(config)
    }

    /// List available provider types.
    pub fn available_types(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    /// Get default configuration for a provider type.
    pub fn default_config(&self, provider_type: &str) -> Option<JsonValue> {
        self.factories
            .get(provider_type)
            .map(|f| f.default_config())
    }

    /// Create a registry with every compiled-in backend registered.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "gemini")]
        registry.register(Arc::new(super::GeminiProviderFactory));

        #[cfg(feature = "glm")]
        registry.register(Arc::new(super::GlmProviderFactory));

        #[cfg(feature = "copilot")]
        registry.register(Arc::new(super::CopilotProviderFactory));

        registry
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.available_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadline::Deadline;
    use crate::providers::ModelInfo;
    use async_trait::async_trait;
    use zest_core::GenerationRequest;

    struct MockProvider {
        name: String,
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn enabled(&self) -> bool {
            true
        }

        fn models(&self) -> Vec<ModelInfo> {
            Vec::new()
        }

        async fn generate(
            &self,
            _deadline: &Deadline,
            _request: &GenerationRequest,
        ) -> Result<String, ProviderError> {
            Ok("mock response".to_string())
        }
    }

    struct MockProviderFactory;

    impl ProviderFactory for MockProviderFactory {
        fn provider_type(&self) -> &'static str {
            "mock"
        }

        fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
            let name = config_str(config, "name", "mock-provider");
            Ok(Arc::new(MockProvider { name }))
        }

        fn description(&self) -> &'static str {
            "Mock provider for testing"
        }
    }

    #[test]
    fn test_registry_register_and_create() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(MockProviderFactory));

        assert_eq!(registry.available_types(), ["mock"]);
        assert!(registry.create("unknown", &serde_json::json!({})).is_err());

        let provider = registry
            .create("mock", &serde_json::json!({ "name": "test-mock" }))
            .unwrap();
        assert_eq!(provider.name(), "test-mock");
    }

    #[test]
    fn test_registry_unknown_provider() {
        let registry = ProviderRegistry::new();
        match registry.create("unknown", &serde_json::json!({})) {
            Err(ProviderError::NotConfigured(msg)) => {
                assert!(msg.contains("Unknown provider type"));
            }
            _ => panic!("Expected NotConfigured error"),
        }
    }

    #[test]
    fn test_create_runs_validation() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(MockProviderFactory));

        let result = registry.create("mock", &serde_json::json!({ "base_url": "ftp://x" }));
        assert!(result.is_err());
        assert!(registry
            .validate("mock", &serde_json::json!({ "model": 3 }))
            .is_err());
        assert!(registry.validate("mock", &JsonValue::Null).is_ok());
    }

    #[test]
    fn test_config_str_trims_trailing_slash() {
        let config = serde_json::json!({ "base_url": "https://example.com/v1/" });
        assert_eq!(config_str(&config, "base_url", "x"), "https://example.com/v1");
        assert_eq!(config_str(&config, "model", "default-model"), "default-model");
    }

    #[test]
    fn test_registry_available_types() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(MockProviderFactory));
        assert!(registry.available_types().contains(&"mock"));
        assert_eq!(registry.default_config("mock"), Some(serde_json::json!({})));
    }
}
