//! Gateway configuration.
//!
//! Loaded once from YAML (or defaults) and turned into an immutable
//! [`GenerationService`]. Nothing here changes after startup.
//!
//! ```yaml
//! generation_timeout: 60s
//! moderation:
//!   min_chars: 10
//!   max_chars: 4000
//! providers:          # trial order
//!   - type: gemini
//!     model: gemini-2.5-flash
//!   - type: glm
//!   - type: copilot
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;
use zest_core::{DenylistModerator, ModerationPolicy};

use crate::providers::{LlmProvider, ProviderError, ProviderRegistry};
use crate::router::ProviderRouter;
use crate::service::GenerationService;

/// Default total budget for one generation request.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound accepted for `generation_timeout`.
pub const MAX_GENERATION_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Provider settings holding credentials. Their values are never printed.
const SECRET_SETTINGS: &[&str] = &["api_key", "oauth_token"];

const REDACTED: &str = "[REDACTED]";

/// Default trial order.
pub const DEFAULT_PROVIDER_ORDER: &[&str] = &["gemini", "glm", "copilot"];

/// Errors that can occur loading or applying configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("provider '{provider}': {source}")]
    Provider {
        provider: String,
        #[source]
        source: ProviderError,
    },
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// Total time budget per request, shared by all provider attempts.
    #[serde(with = "humantime_duration")]
    pub generation_timeout: Duration,

    pub moderation: ModerationConfig,

    /// Providers in default trial order.
    pub providers: Vec<ProviderEntry>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            moderation: ModerationConfig::default(),
            providers: DEFAULT_PROVIDER_ORDER
                .iter()
                .map(|name| ProviderEntry::new(*name))
                .collect(),
        }
    }
}

/// Moderation gate settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModerationConfig {
    pub min_chars: usize,
    pub max_chars: usize,

    /// Replaces the built-in denylist when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denylist: Option<Vec<String>>,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        let policy = ModerationPolicy::default();
        Self {
            min_chars: policy.min_chars,
            max_chars: policy.max_chars,
            denylist: None,
        }
    }
}

impl ModerationConfig {
    pub fn policy(&self) -> ModerationPolicy {
        let mut policy = ModerationPolicy {
            min_chars: self.min_chars,
            max_chars: self.max_chars,
            ..ModerationPolicy::default()
        };
        if let Some(terms) = &self.denylist {
            policy.denylist = terms.clone();
        }
        policy
    }
}

/// One provider in the trial order. Everything besides `type` is handed
/// to that provider's factory.
///
/// Debug and serialized output redact credential settings.
#[derive(Clone, PartialEq, Deserialize)]
pub struct ProviderEntry {
    #[serde(rename = "type")]
    pub provider_type: String,

    #[serde(flatten)]
    pub settings: Map<String, JsonValue>,
}

impl ProviderEntry {
    pub fn new(provider_type: impl Into<String>) -> Self {
        Self {
            provider_type: provider_type.into(),
            settings: Map::new(),
        }
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    fn settings_value(&self) -> JsonValue {
        JsonValue::Object(self.settings.clone())
    }

    fn redacted_settings(&self) -> Map<String, JsonValue> {
        self.settings
            .iter()
            .map(|(key, value)| {
                if SECRET_SETTINGS.contains(&key.as_str()) {
                    (key.clone(), JsonValue::from(REDACTED))
                } else {
                    (key.clone(), value.clone())
                }
            })
            .collect()
    }
}

impl fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("provider_type", &self.provider_type)
            .field("settings", &self.redacted_settings())
            .finish()
    }
}

impl Serialize for ProviderEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let settings = self.redacted_settings();
        let mut map = serializer.serialize_map(Some(settings.len() + 1))?;
        map.serialize_entry("type", &self.provider_type)?;
        for (key, value) in &settings {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl GatewayConfig {
    /// Parse and validate YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: GatewayConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// Structural checks that need no provider registry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "generation_timeout must be greater than zero".to_string(),
            ));
        }
        if self.generation_timeout > MAX_GENERATION_TIMEOUT {
            return Err(ConfigError::Invalid(format!(
                "generation_timeout ({}) exceeds the maximum of {}",
                humantime::format_duration(self.generation_timeout),
                humantime::format_duration(MAX_GENERATION_TIMEOUT)
            )));
        }

        if self.moderation.min_chars > self.moderation.max_chars {
            return Err(ConfigError::Invalid(format!(
                "moderation.min_chars ({}) exceeds moderation.max_chars ({})",
                self.moderation.min_chars, self.moderation.max_chars
            )));
        }

        let mut seen = HashSet::new();
        for entry in &self.providers {
            if entry.provider_type.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "provider entry is missing 'type'".to_string(),
                ));
            }
            if !seen.insert(entry.provider_type.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "provider '{}' is listed more than once",
                    entry.provider_type
                )));
            }
        }

        Ok(())
    }

    /// Check every provider entry against its factory.
    pub fn validate_providers(&self, registry: &ProviderRegistry) -> Result<(), ConfigError> {
        for entry in &self.providers {
            registry
                .validate(&entry.provider_type, &entry.settings_value())
                .map_err(|source| ConfigError::Provider {
                    provider: entry.provider_type.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Instantiate providers in configured order.
    pub fn build_providers(
        &self,
        registry: &ProviderRegistry,
    ) -> Result<Vec<Arc<dyn LlmProvider>>, ConfigError> {
        self.providers
            .iter()
            .map(|entry| {
                let provider = registry
                    .create(&entry.provider_type, &entry.settings_value())
                    .map_err(|source| ConfigError::Provider {
                        provider: entry.provider_type.clone(),
                        source,
                    })?;
                tracing::debug!(
                    provider = %provider.name(),
                    enabled = provider.enabled(),
                    "Configured provider"
                );
                Ok(provider)
            })
            .collect()
    }

    pub fn build_router(&self, registry: &ProviderRegistry) -> Result<ProviderRouter, ConfigError> {
        Ok(ProviderRouter::new(self.build_providers(registry)?))
    }

    pub fn build_moderator(&self) -> DenylistModerator {
        DenylistModerator::new(self.moderation.policy())
    }

    /// Build the full generation pipeline.
    pub fn build_service(&self, registry: &ProviderRegistry) -> Result<GenerationService, ConfigError> {
        self.validate()?;
        let router = self.build_router(registry)?;

        if router.enabled_count() == 0 {
            tracing::warn!("No provider has credentials; generation requests will fail");
        }

        Ok(GenerationService::builder()
            .moderator(Arc::new(self.build_moderator()))
            .router(router)
            .timeout(self.generation_timeout)
            .build())
    }
}

/// `Duration` as a humantime string ("60s", "1m 30s").
mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderFactory;
    use crate::router::tests::MockProvider;

    struct MockFactory(&'static str);

    impl ProviderFactory for MockFactory {
        fn provider_type(&self) -> &'static str {
            self.0
        }

        fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
            if config["api_key"].as_str().is_some() {
                Ok(MockProvider::succeeding(self.0, "<p>ok</p>"))
            } else {
                Ok(MockProvider::disabled(self.0))
            }
        }
    }

    fn registry() -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        for name in ["gemini", "glm", "copilot"] {
            registry.register(Arc::new(MockFactory(name)));
        }
        registry
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.generation_timeout, Duration::from_secs(60));
        assert_eq!(config.moderation.min_chars, 10);
        assert_eq!(config.moderation.max_chars, 4000);
        let order: Vec<_> = config.providers.iter().map(|p| p.provider_type.as_str()).collect();
        assert_eq!(order, ["gemini", "glm", "copilot"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let config = GatewayConfig::from_yaml(
            r#"
generation_timeout: 1m 30s
moderation:
  max_chars: 2000
  denylist: [forbidden]
providers:
  - type: glm
    model: glm-4.5
    base_url: https://proxy.example.com/v4
  - type: gemini
"#,
        )
        .unwrap();

        assert_eq!(config.generation_timeout, Duration::from_secs(90));
        assert_eq!(config.moderation.min_chars, 10);
        assert_eq!(config.moderation.max_chars, 2000);
        assert_eq!(config.moderation.policy().denylist, vec!["forbidden"]);
        assert_eq!(config.providers[0].provider_type, "glm");
        assert_eq!(config.providers[0].settings["model"], "glm-4.5");
        assert!(config.providers[1].settings.is_empty());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = GatewayConfig::from_yaml("{}").unwrap();
        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn test_yaml_round_trip_keeps_duration_readable() {
        let yaml = serde_yaml::to_string(&GatewayConfig::default()).unwrap();
        assert!(yaml.contains("generation_timeout: 1m"));
    }

    #[test]
    fn test_credentials_redacted_in_output() {
        let config = GatewayConfig::from_yaml(
            r#"
providers:
  - type: gemini
    api_key: sk-gemini-secret
    model: gemini-2.5-pro
  - type: copilot
    oauth_token: gho_copilot_secret
"#,
        )
        .unwrap();

        let yaml = serde_yaml::to_string(&config).unwrap();
        let debug = format!("{:?}", config);
        for output in [&yaml, &debug] {
            assert!(!output.contains("sk-gemini-secret"), "key exposed: {}", output);
            assert!(!output.contains("gho_copilot_secret"), "token exposed: {}", output);
            assert!(output.contains("[REDACTED]"));
            assert!(output.contains("gemini-2.5-pro"));
        }

        // the factory still sees the real value
        assert_eq!(config.providers[0].settings_value()["api_key"], "sk-gemini-secret");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            GatewayConfig::from_yaml("generation_timeout: 0s"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            GatewayConfig::from_yaml("moderation: { min_chars: 50, max_chars: 10 }"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            GatewayConfig::from_yaml("providers: [{type: glm}, {type: glm}]"),
            Err(ConfigError::Invalid(msg)) if msg.contains("more than once")
        ));
        assert!(matches!(
            GatewayConfig::from_yaml("generation_timeout: 500000000000years"),
            Err(ConfigError::Invalid(msg)) if msg.contains("maximum")
        ));
        assert!(GatewayConfig::from_yaml("generation_timeout: 1h").is_ok());
        assert!(matches!(
            GatewayConfig::from_yaml("generation_timeout: soon"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            GatewayConfig::from_yaml("unknown_key: 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = GatewayConfig::from_yaml_file("/nonexistent/zest.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/zest.yaml"));
    }

    #[test]
    fn test_unknown_provider_type() {
        let config = GatewayConfig::from_yaml("providers: [{type: mystery}]").unwrap();
        match config.build_router(&registry()) {
            Err(ConfigError::Provider { provider, .. }) => assert_eq!(provider, "mystery"),
            other => panic!("expected provider error, got {:?}", other.map(|_| ())),
        }
        assert!(config.validate_providers(&registry()).is_err());
    }

    #[test]
    fn test_build_router_keeps_order_and_enablement() {
        let config = GatewayConfig::from_yaml(
            r#"
providers:
  - type: copilot
  - type: gemini
    api_key: key
"#,
        )
        .unwrap();
        let router = config.build_router(&registry()).unwrap();
        let catalog = router.catalog();
        assert_eq!(catalog[0].name, "copilot");
        assert!(!catalog[0].enabled);
        assert_eq!(catalog[1].name, "gemini");
        assert!(catalog[1].enabled);
    }

    #[test]
    fn test_build_service() {
        let config = GatewayConfig::default();
        let service = config.build_service(&registry()).unwrap();
        assert_eq!(service.timeout(), Duration::from_secs(60));
        assert_eq!(service.models().len(), 3);
    }
}
