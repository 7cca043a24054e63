//! Ordered fallback dispatch across providers.
//!
//! The router walks its provider list strictly sequentially: the first
//! success wins, disabled providers are skipped for free, and at most
//! [`MAX_FALLBACK_ATTEMPTS`] calls are made. All attempts share one
//! [`Deadline`]; it is checked before each attempt and bounds each call.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use zest_core::GenerationRequest;

use crate::deadline::Deadline;
use crate::providers::{LlmProvider, ProviderInfo};

/// Maximum number of provider calls per routed request.
pub const MAX_FALLBACK_ATTEMPTS: usize = 3;

/// One failed provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub provider: String,
    pub message: String,
}

impl AttemptFailure {
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.message)
    }
}

fn join_failures(failures: &[AttemptFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Why a routed request produced no text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// Zero attempts: no configured provider is enabled.
    #[error("no generation provider is enabled")]
    NoProvidersEnabled,

    /// Every attempted provider failed, or the attempt budget ran out.
    #[error("all providers failed (attempts={attempts}): {}", join_failures(.failures))]
    AllProvidersFailed {
        attempts: usize,
        failures: Vec<AttemptFailure>,
    },

    /// The shared deadline elapsed before a provider succeeded.
    #[error("generation deadline exceeded (attempts={attempts}): {}", join_failures(.failures))]
    DeadlineExceeded {
        attempts: usize,
        failures: Vec<AttemptFailure>,
    },
}

impl RoutingError {
    /// Number of provider calls made.
    pub fn attempts(&self) -> usize {
        match self {
            RoutingError::NoProvidersEnabled => 0,
            RoutingError::AllProvidersFailed { attempts, .. }
            | RoutingError::DeadlineExceeded { attempts, .. } => *attempts,
        }
    }

    pub fn failures(&self) -> &[AttemptFailure] {
        match self {
            RoutingError::NoProvidersEnabled => &[],
            RoutingError::AllProvidersFailed { failures, .. }
            | RoutingError::DeadlineExceeded { failures, .. } => failures,
        }
    }
}

/// Raw text and the provider that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedGeneration {
    pub text: String,
    pub provider: String,
}

/// Immutable, ordered provider list with fallback dispatch.
///
/// Holds no per-request state, so one router serves any number of
/// concurrent requests.
#[derive(Clone)]
pub struct ProviderRouter {
    providers: Vec<Arc<dyn LlmProvider>>,
}

impl ProviderRouter {
    /// Build a router. The order given is the default trial order.
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        Self { providers }
    }

    /// Catalog of every configured provider, in trial order.
    pub fn catalog(&self) -> Vec<ProviderInfo> {
        self.providers.iter().map(|p| p.info()).collect()
    }

    pub fn enabled_count(&self) -> usize {
        self.providers.iter().filter(|p| p.enabled()).count()
    }

    /// Trial order for a request: the preferred provider first when it is
    /// configured, everything else in configured order.
    fn trial_order(&self, preferred: Option<&str>) -> Vec<&Arc<dyn LlmProvider>> {
        let mut order: Vec<&Arc<dyn LlmProvider>> = self.providers.iter().collect();

        if let Some(name) = preferred {
            if let Some(idx) = order.iter().position(|p| p.name() == name) {
                let chosen = order.remove(idx);
                order.insert(0, chosen);
            }
        }

        order
    }

    /// Dispatch `request` with ordered fallback under `deadline`.
    pub async fn route(
        &self,
        deadline: &Deadline,
        request: &GenerationRequest,
    ) -> Result<RoutedGeneration, RoutingError> {
        let mut failures: Vec<AttemptFailure> = Vec::new();

        for provider in self.trial_order(request.preferred_provider()) {
            if failures.len() >= MAX_FALLBACK_ATTEMPTS {
                break;
            }

            if !provider.enabled() {
                tracing::debug!(provider = %provider.name(), "Provider disabled, skipping");
                continue;
            }

            if deadline.is_expired() {
                tracing::warn!(
                    request_id = %request.request_id,
                    attempts = failures.len(),
                    "Deadline elapsed before next attempt"
                );
                return Err(RoutingError::DeadlineExceeded {
                    attempts: failures.len(),
                    failures,
                });
            }

            let attempt = failures.len() + 1;
            let call = provider.generate(deadline, request);

            match tokio::time::timeout_at(deadline.instant(), call).await {
                Ok(Ok(text)) => {
                    tracing::info!(
                        request_id = %request.request_id,
                        provider = %provider.name(),
                        attempt,
                        "Provider succeeded"
                    );
                    return Ok(RoutedGeneration {
                        text,
                        provider: provider.name().to_string(),
                    });
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        request_id = %request.request_id,
                        provider = %provider.name(),
                        attempt,
                        error = %e,
                        "Provider failed"
                    );
                    failures.push(AttemptFailure::new(provider.name(), e.to_string()));
                }
                Err(_) => {
                    tracing::warn!(
                        request_id = %request.request_id,
                        provider = %provider.name(),
                        attempt,
                        "Provider timed out at deadline"
                    );
                    failures.push(AttemptFailure::new(provider.name(), "deadline exceeded"));
                    return Err(RoutingError::DeadlineExceeded {
                        attempts: failures.len(),
                        failures,
                    });
                }
            }
        }

        if failures.is_empty() {
            tracing::warn!(request_id = %request.request_id, "No provider enabled");
            return Err(RoutingError::NoProvidersEnabled);
        }

        Err(RoutingError::AllProvidersFailed {
            attempts: failures.len(),
            failures,
        })
    }
}

impl fmt::Debug for ProviderRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("ProviderRouter")
            .field("providers", &names)
            .finish()
    }
}
