//! GitHub Copilot provider.
//!
//! Copilot needs two credentials: a long-lived OAuth token from the
//! environment, exchanged for a short-lived session token that authorizes
//! chat completions. The session token is cached and refreshed shortly
//! before it expires. Concurrent callers share one refresh.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use serde::Deserialize;
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

/// Environment variable holding the GitHub OAuth token.
pub const COPILOT_TOKEN_ENV: &str = "GITHUB_COPILOT_TOKEN";

const PROVIDER_NAME: &str = "copilot";
const DEFAULT_TOKEN_URL: &str = "https://api.github.com/copilot_internal/v2/token";
const DEFAULT_BASE_URL: &str = "https://api.githubcopilot.com";
const DEFAULT_MODEL: &str = "gpt-4o";

const EDITOR_VERSION: &str = "vscode/1.85.0";
const EDITOR_PLUGIN_VERSION: &str = "copilot-chat/0.12.0";
const USER_AGENT: &str = "GithubCopilot/1.155.0";
const INTEGRATION_ID: &str = "vscode-chat";

/// Session tokens are treated as expired this many seconds early.
const EXPIRY_MARGIN_SECS: i64 = 30;

/// Exchanged session token and its expiry.
#[derive(Clone)]
struct SessionToken {
    token: Arc<ApiCredential>,
    expires_at: DateTime<Utc>,
}

impl SessionToken {
    fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - TimeDelta::seconds(EXPIRY_MARGIN_SECS)
    }
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
    /// Unix seconds
    expires_at: i64,
}

impl TokenResponse {
    fn into_session(self) -> Result<SessionToken, ProviderError> {
        if self.token.is_empty() {
            return Err(ProviderError::AuthError(
                "token exchange returned an empty token".to_string(),
            ));
        }
        let expires_at = DateTime::from_timestamp(self.expires_at, 0).ok_or_else(|| {
            ProviderError::ParseError(format!("invalid expires_at: {}", self.expires_at))
        })?;
        Ok(SessionToken {
            token: Arc::new(ApiCredential::new(
                self.token,
                CredentialSource::Exchanged,
                "Copilot session token",
            )),
            expires_at,
        })
    }
}

/// Copilot provider.
pub struct CopilotProvider {
    oauth: Option<ApiCredential>,
    token_url: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
    session: RwLock<Option<SessionToken>>,
    refresh: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for CopilotProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopilotProvider")
            .field("oauth", &self.oauth)
            .field("token_url", &self.token_url)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field(
                "session_expires_at",
                &self.session.read().as_ref().map(|s| s.expires_at),
            )
            .finish()
    }
}

impl CopilotProvider {
    /// Create a provider with an explicit OAuth token.
    pub fn new(oauth_token: impl Into<String>) -> Result<Self, ProviderError> {
        Self::build(
            Some(ApiCredential::new(
                oauth_token,
                CredentialSource::Programmatic,
                "GitHub OAuth token",
            )),
            &serde_json::json!({}),
        )
    }

    /// Create from JSON configuration with `GITHUB_COPILOT_TOKEN` fallback.
    /// `oauth_token` wins over `api_key` when both are set. Without a token
    /// the provider is built disabled.
    pub fn from_config(config: &JsonValue) -> Result<Self, ProviderError> {
        let key = if config["oauth_token"].as_str().is_some_and(|v| !v.is_empty()) {
            "oauth_token"
        } else {
            "api_key"
        };
        let oauth = ApiCredential::optional_from_config_or_env(
            config,
            key,
            COPILOT_TOKEN_ENV,
            "GitHub OAuth token",
        );
        Self::build(oauth, config)
    }

    fn build(oauth: Option<ApiCredential>, config: &JsonValue) -> Result<Self, ProviderError> {
        Ok(Self {
            oauth,
            token_url: config_str(config, "token_url", DEFAULT_TOKEN_URL),
            base_url: config_str(config, "base_url", DEFAULT_BASE_URL),
            model: config_str(config, "model", DEFAULT_MODEL),
            client: http::build_client()?,
            session: RwLock::new(None),
            refresh: tokio::sync::Mutex::new(()),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    fn cached_session(&self) -> Option<Arc<ApiCredential>> {
        let now = Utc::now();
        self.session
            .read()
            .as_ref()
            .filter(|s| s.is_valid(now))
            .map(|s| Arc::clone(&s.token))
    }

    fn invalidate_session(&self) {
        *self.session.write() = None;
    }

    /// A valid session token, exchanging the OAuth token if needed.
    async fn session_token(
        &self,
        oauth: &ApiCredential,
        deadline: &Deadline,
    ) -> Result<Arc<ApiCredential>, ProviderError> {
        if let Some(token) = self.cached_session() {
            return Ok(token);
        }

        let _guard = self.refresh.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(token) = self.cached_session() {
            return Ok(token);
        }

        let session = self.exchange(oauth, deadline).await?;
        tracing::debug!(
            provider = PROVIDER_NAME,
            expires_at = %session.expires_at,
            "Refreshed session token"
        );
        let token = Arc::clone(&session.token);
        *self.session.write() = Some(session);
        Ok(token)
    }

    async fn exchange(
        &self,
        oauth: &ApiCredential,
        deadline: &Deadline,
    ) -> Result<SessionToken, ProviderError> {
        let timeout = http::call_timeout(deadline)?;

        // SECURITY: Only expose the credential here, at the point of use
        let response = self
            .client
            .get(&self.token_url)
            .bearer_auth(oauth.expose())
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header("Editor-Version", EDITOR_VERSION)
            .header("Editor-Plugin-Version", EDITOR_PLUGIN_VERSION)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| http::send_error(e, timeout))?;

        if !response.status().is_success() {
            return Err(match http::status_error(response).await {
                ProviderError::ApiError { status, message } => ProviderError::AuthError(format!(
                    "token exchange failed with status {}: {}",
                    status, message
                )),
                other => other,
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        body.into_session()
    }
}

#[async_trait]
impl LlmProvider for CopilotProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn enabled(&self) -> bool {
        self.oauth.as_ref().is_some_and(|c| !c.is_empty())
    }

    fn models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo::new("gpt-4o", "GPT-4o", PROVIDER_NAME),
            ModelInfo::new("gpt-4o-mini", "GPT-4o Mini", PROVIDER_NAME),
            ModelInfo::new("claude-3.5-sonnet", "Claude 3.5 Sonnet", PROVIDER_NAME),
        ]
    }

    async fn generate(
        &self,
        deadline: &Deadline,
        request: &GenerationRequest,
    ) -> Result<String, ProviderError> {
        let oauth = self.oauth.as_ref().ok_or_else(|| {
            ProviderError::NotConfigured(format!("{} not set", COPILOT_TOKEN_ENV))
        })?;

        let token = self.session_token(oauth, deadline).await?;

        let model = request.model_for(PROVIDER_NAME).unwrap_or(&self.model);
        let body = ChatRequest::for_generation(model, request);
        let url = format!("{}/chat/completions", self.base_url);

        let result = send_chat(
            &self.client,
            PROVIDER_NAME,
            &url,
            token.expose(),
            &[
                ("Copilot-Integration-Id", INTEGRATION_ID),
                ("Editor-Version", EDITOR_VERSION),
                ("Editor-Plugin-Version", EDITOR_PLUGIN_VERSION),
            ],
            &body,
            deadline,
        )
        .await;

        if matches!(result, Err(ProviderError::AuthError(_))) {
            self.invalidate_session();
        }
        result
    }
}

/// Factory for Copilot providers.
///
/// ## Configuration Format
/// ```yaml
/// - type: copilot
///   oauth_token: "..."        # Optional, or api_key; falls back to GITHUB_COPILOT_TOKEN env
///   base_url: "https://..."   # Optional chat endpoint base
///   token_url: "https://..."  # Optional token exchange endpoint
///   model: gpt-4o             # Optional default model
/// ```
pub struct CopilotProviderFactory;

impl ProviderFactory for CopilotProviderFactory {
    fn provider_type(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(Arc::new(CopilotProvider::from_config(config)?))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        super::factory::validate_common_config(config)?;
        for key in ["oauth_token", "token_url"] {
            if !config[key].is_null() && !config[key].is_string() {
                return Err(ProviderError::NotConfigured(format!(
                    "'{}' must be a string",
                    key
                )));
            }
        }
        Ok(())
    }

    fn default_config(&self) -> JsonValue {
        serde_json::json!({
            "model": DEFAULT_MODEL,
            "base_url": DEFAULT_BASE_URL,
            "token_url": DEFAULT_TOKEN_URL
        })
    }

    fn description(&self) -> &'static str {
        "GitHub Copilot chat completions via session token exchange"
    }
}
