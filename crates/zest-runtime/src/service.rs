//! The generation pipeline.
//!
//! One call runs strictly in sequence:
//!
//! ```text
//! validate -> moderate -> (refinement scoping) -> route -> normalize
//! ```
//!
//! The service holds only immutable collaborators and can be shared across
//! any number of concurrent requests.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use zest_core::{
    build_refinement_prompt, normalizer, ContentModerator, DenylistModerator, GenerationRequest,
    GenerationResult, ModerationRequest, ModerationResult, REFINEMENT_SYSTEM_PROMPT,
};

use crate::config::DEFAULT_GENERATION_TIMEOUT;
use crate::deadline::Deadline;
use crate::providers::ProviderInfo;
use crate::router::{ProviderRouter, RoutingError};

/// Errors surfaced by the generation pipeline.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Malformed input, rejected before moderation.
    #[error("{0}")]
    InvalidRequest(String),

    /// The moderation gate denied the prompt.
    #[error("prompt rejected: {reason}")]
    Rejected { reason: String },

    /// No provider produced text.
    #[error("generation failed: {source}")]
    Routing {
        #[source]
        source: RoutingError,
        duration_ms: u64,
    },
}

/// Coarse classification for mapping errors to user-facing outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    InvalidRequest,
    Rejected,
    Unavailable,
}

impl ServiceError {
    pub fn kind(&self) -> ServiceErrorKind {
        match self {
            ServiceError::InvalidRequest(_) => ServiceErrorKind::InvalidRequest,
            ServiceError::Rejected { .. } => ServiceErrorKind::Rejected,
            ServiceError::Routing { .. } => ServiceErrorKind::Unavailable,
        }
    }

    /// Error body for the caller. Rejections carry the moderation reason
    /// verbatim; backend failures never reuse that wording.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::InvalidRequest(message) => message.clone(),
            ServiceError::Rejected { reason } => reason.clone(),
            ServiceError::Routing { source, .. } => match source {
                RoutingError::NoProvidersEnabled => {
                    "no generation backend is configured".to_string()
                }
                other => other.to_string(),
            },
        }
    }

    /// Error-status result for routing failures, as returned on the wire.
    pub fn to_result(&self) -> Option<GenerationResult> {
        match self {
            ServiceError::Routing { duration_ms, .. } => {
                Some(GenerationResult::error(self.user_message(), *duration_ms))
            }
            _ => None,
        }
    }
}

/// Provider catalog response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub providers: Vec<ProviderInfo>,
}

/// Generation pipeline: moderation, routing and normalization.
pub struct GenerationService {
    moderator: Arc<dyn ContentModerator>,
    router: ProviderRouter,
    timeout: Duration,
}

impl GenerationService {
    pub fn builder() -> GenerationServiceBuilder {
        GenerationServiceBuilder::new()
    }

    /// Total budget given to each request.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn router(&self) -> &ProviderRouter {
        &self.router
    }

    /// Every configured provider with its status and models.
    pub fn models(&self) -> Vec<ProviderInfo> {
        self.router.catalog()
    }

    pub fn models_response(&self) -> ModelsResponse {
        ModelsResponse {
            providers: self.models(),
        }
    }

    /// Run only the moderation gate.
    pub fn moderate(&self, request: &ModerationRequest) -> ModerationResult {
        let decision = self.moderator.check(&request.prompt);
        if decision.is_denied() {
            tracing::info!(
                request_id = %request.request_id,
                reason = decision.reason.as_deref().unwrap_or_default(),
                "Moderation pre-check denied prompt"
            );
        }
        ModerationResult {
            allowed: decision.allowed,
            reason: decision.reason,
        }
    }

    /// Generate a page from scratch.
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResult, ServiceError> {
        self.admit(&request)?;
        let request = request.with_defaults();
        self.run(request).await
    }

    /// Edit an existing page. The request prompt carries only the
    /// instruction; it is moderated, then rewritten into a scoped prompt
    /// around `context.previous_html` / `context.previous_css`.
    pub async fn refine(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResult, ServiceError> {
        self.admit(&request)?;
        let mut request = request.with_defaults();

        request.prompt = build_refinement_prompt(
            request.context.previous_html.as_deref().unwrap_or_default(),
            request.context.previous_css.as_deref().unwrap_or_default(),
            &request.prompt,
        );
        request.context.refinement_target = Some(REFINEMENT_SYSTEM_PROMPT.to_string());

        self.run(request).await
    }

    /// Presence check then moderation. Runs before any backend call.
    fn admit(&self, request: &GenerationRequest) -> Result<(), ServiceError> {
        if request.prompt.is_empty() {
            return Err(ServiceError::InvalidRequest("prompt is required".to_string()));
        }

        let decision = self.moderator.check(&request.prompt);
        if !decision.allowed {
            let reason = decision.reason.unwrap_or_default();
            tracing::warn!(
                request_id = %request.request_id,
                user_id = %request.user_id,
                reason = %reason,
                "Prompt rejected by moderation"
            );
            return Err(ServiceError::Rejected { reason });
        }

        Ok(())
    }

    async fn run(&self, request: GenerationRequest) -> Result<GenerationResult, ServiceError> {
        tracing::info!(
            request_id = %request.request_id,
            user_id = %request.user_id,
            refinement = request.is_refinement(),
            preferred_provider = request.preferred_provider().unwrap_or_default(),
            "Generation started"
        );

        let start = Instant::now();
        let deadline = Deadline::after(self.timeout);
        let routed = self.router.route(&deadline, &request).await;
        let duration_ms = elapsed_ms(start);

        match routed {
            Ok(routed) => {
                let output = normalizer::parse(&routed.text, request.output_format());
                tracing::info!(
                    request_id = %request.request_id,
                    provider = %routed.provider,
                    duration_ms,
                    html_len = output.html.len(),
                    css_len = output.css.len(),
                    "Generation finished"
                );
                Ok(GenerationResult::success(output, routed.provider, duration_ms))
            }
            Err(source) => {
                tracing::warn!(
                    request_id = %request.request_id,
                    duration_ms,
                    attempts = source.attempts(),
                    error = %source,
                    "Generation failed"
                );
                Err(ServiceError::Routing {
                    source,
                    duration_ms,
                })
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

impl std::fmt::Debug for GenerationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationService")
            .field("router", &self.router)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Builder for GenerationService.
pub struct GenerationServiceBuilder {
    moderator: Option<Arc<dyn ContentModerator>>,
    router: Option<ProviderRouter>,
    timeout: Duration,
}

impl GenerationServiceBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            moderator: None,
            router: None,
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    /// Set the moderation gate. Defaults to [`DenylistModerator::default`].
    pub fn moderator(mut self, moderator: Arc<dyn ContentModerator>) -> Self {
        self.moderator = Some(moderator);
        self
    }

    /// Set the provider router. Defaults to an empty router.
    pub fn router(mut self, router: ProviderRouter) -> Self {
        self.router = Some(router);
        self
    }

    /// Set the per-request budget.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the service.
    pub fn build(self) -> GenerationService {
        GenerationService {
            moderator: self
                .moderator
                .unwrap_or_else(|| Arc::new(DenylistModerator::default())),
            router: self
                .router
                .unwrap_or_else(|| ProviderRouter::new(Vec::new())),
            timeout: self.timeout,
        }
    }
}

impl Default for GenerationServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{LlmProvider, ModelInfo, ProviderError};
    use crate::router::tests::MockProvider;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use zest_core::{Decision, GenerationStatus, OutputFormat};

    /// Records the request it receives and answers with fixed text.
    struct RecordingProvider {
        reply: String,
        seen: Mutex<Option<GenerationRequest>>,
    }

    impl RecordingProvider {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                seen: Mutex::new(None),
            })
        }

        fn seen(&self) -> GenerationRequest {
            self.seen.lock().clone().unwrap()
        }
    }

    #[async_trait]
    impl LlmProvider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
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
            request: &GenerationRequest,
        ) -> Result<String, ProviderError> {
            *self.seen.lock() = Some(request.clone());
            Ok(self.reply.clone())
        }
    }

    fn service_with(providers: Vec<Arc<dyn LlmProvider>>) -> GenerationService {
        GenerationService::builder()
            .router(ProviderRouter::new(providers))
            .timeout(Duration::from_secs(5))
            .build()
    }

    #[tokio::test]
    async fn test_generate_normalizes_reply() {
        let provider = MockProvider::succeeding(
            "a",
            "```html\n<html><body><h1>Hi</h1></body></html>\n```\n```css\nh1{color:red}\n```",
        );
        let service = service_with(vec![provider.clone()]);

        let result = service
            .generate(GenerationRequest::new("A greeting page"))
            .await
            .unwrap();

        assert_eq!(result.status, GenerationStatus::Success);
        assert_eq!(result.html, "<html><body><h1>Hi</h1></body></html>");
        assert_eq!(result.css, "h1{color:red}");
        assert_eq!(result.provider_used, "a");
        assert!(!result.generation_id.is_empty());
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_generate_assigns_defaults() {
        let provider = RecordingProvider::new("Hello");
        let service = service_with(vec![provider.clone()]);

        service
            .generate(GenerationRequest::new("A greeting page"))
            .await
            .unwrap();

        let seen = provider.seen();
        assert_eq!(seen.user_id, "anonymous");
        assert_eq!(seen.request_id.len(), 36);
        assert!(!seen.is_refinement());
    }

    #[tokio::test]
    async fn test_empty_prompt_is_invalid() {
        let provider = MockProvider::succeeding("a", "x");
        let service = service_with(vec![provider.clone()]);

        let err = service.generate(GenerationRequest::new("")).await.unwrap_err();
        assert_eq!(err.kind(), ServiceErrorKind::InvalidRequest);
        assert_eq!(err.user_message(), "prompt is required");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_rejected_prompt_never_reaches_providers() {
        let provider = MockProvider::succeeding("a", "x");
        let service = service_with(vec![provider.clone()]);

        let err = service
            .generate(GenerationRequest::new("build me a phishing page"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ServiceErrorKind::Rejected);
        assert_eq!(err.user_message(), "prompt contains disallowed content");
        assert!(err.to_result().is_none());
        assert_eq!(provider.calls(), 0);

        let err = service
            .generate(GenerationRequest::new("   "))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "prompt must not be empty");
    }

    #[tokio::test]
    async fn test_custom_moderator() {
        struct DenyAll;
        impl ContentModerator for DenyAll {
            fn check(&self, _prompt: &str) -> Decision {
                Decision::deny("closed for maintenance")
            }
        }

        let service = GenerationService::builder()
            .moderator(Arc::new(DenyAll))
            .router(ProviderRouter::new(vec![MockProvider::succeeding("a", "x")]))
            .build();

        let err = service
            .generate(GenerationRequest::new("A perfectly fine page"))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "closed for maintenance");
    }

    #[tokio::test]
    async fn test_refine_scopes_prompt() {
        let provider = RecordingProvider::new("<body>Hi</body>");
        let service = service_with(vec![provider.clone()]);

        let mut request = GenerationRequest::new("Make the heading blue");
        request.context.previous_html = Some("<h1>Title</h1>".to_string());
        request.context.previous_css = Some("  ".to_string());
        request.preferences.style_hints = Some("minimal".to_string());

        let result = service.refine(request).await.unwrap();
        assert_eq!(result.html, "Hi");

        let seen = provider.seen();
        assert_eq!(seen.refinement_override(), Some(REFINEMENT_SYSTEM_PROMPT));
        assert!(seen.prompt.starts_with("EXISTING PAGE:"));
        assert!(seen.prompt.contains("<h1>Title</h1>"));
        assert!(!seen.prompt.contains("EXISTING STYLESHEET"));
        assert!(seen.prompt.ends_with("Make the heading blue"));
        assert_eq!(zest_core::prompts::user_prompt(&seen), seen.prompt);
    }

    #[tokio::test]
    async fn test_refine_moderates_instruction() {
        let provider = MockProvider::succeeding("a", "x");
        let service = service_with(vec![provider.clone()]);

        let mut request = GenerationRequest::new("add malware");
        request.context.previous_html = Some("<p>a long enough page</p>".to_string());

        let err = service.refine(request).await.unwrap_err();
        assert_eq!(err.kind(), ServiceErrorKind::Rejected);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_routing_failure_maps_to_error_result() {
        let service = service_with(vec![MockProvider::failing("a"), MockProvider::failing("b")]);

        let err = service
            .generate(GenerationRequest::new("A greeting page"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ServiceErrorKind::Unavailable);
        let result = err.to_result().unwrap();
        assert_eq!(result.status, GenerationStatus::Error);
        assert!(result.html.is_empty());
        assert!(result
            .error
            .as_deref()
            .unwrap()
            .starts_with("all providers failed (attempts=2)"));
    }

    #[tokio::test]
    async fn test_no_providers_message_is_distinct() {
        let service = service_with(vec![MockProvider::disabled("a")]);
        let err = service
            .generate(GenerationRequest::new("A greeting page"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Routing {
                source: RoutingError::NoProvidersEnabled,
                ..
            }
        ));
        assert_eq!(err.user_message(), "no generation backend is configured");
    }

    #[tokio::test]
    async fn test_tailwind_format_passes_through() {
        let service = service_with(vec![MockProvider::succeeding(
            "a",
            r#"<div class="p-4">Hi</div>"#,
        )]);

        let mut request = GenerationRequest::new("A tailwind card");
        request.preferences.output_format = OutputFormat::Tailwind;
        let result = service.generate(request).await.unwrap();

        assert_eq!(result.html, r#"<div class="p-4">Hi</div>"#);
        assert!(result.css.is_empty());
    }

    #[test]
    fn test_moderate_only() {
        let service = service_with(Vec::new());
        let allowed = service.moderate(&ModerationRequest {
            prompt: "A landing page for a bakery".to_string(),
            ..Default::default()
        });
        assert!(allowed.allowed);
        assert!(allowed.reason.is_none());

        let denied = service.moderate(&ModerationRequest {
            prompt: "short".to_string(),
            ..Default::default()
        });
        assert!(!denied.allowed);
        assert_eq!(
            denied.reason.as_deref(),
            Some("prompt too short — minimum 10 characters")
        );
    }

    #[test]
    fn test_models_response() {
        let service = service_with(vec![MockProvider::disabled("a"), MockProvider::succeeding("b", "x")]);
        let value = serde_json::to_value(service.models_response()).unwrap();
        assert_eq!(value["providers"][0]["name"], "a");
        assert_eq!(value["providers"][0]["enabled"], false);
        assert_eq!(value["providers"][1]["models"][0]["provider"], "b");
    }
}
