//! # zest-runtime
//!
//! Backend dispatch and the generation pipeline for the Zest gateway.
//!
//! This crate owns everything that waits on the network:
//! - The [`LlmProvider`] capability every backend implements
//! - The [`ProviderRouter`] that tries backends in order with fallback
//! - The [`GenerationService`] that chains moderation, prompt scoping,
//!   routing and normalization for a single request
//!
//! The decision logic it calls into (moderation, prompts, normalization)
//! lives in `zest-core` and is fully deterministic.
//!
//! ## Example
//!
//! ```rust,ignore
//! use zest_runtime::{GatewayConfig, ProviderRegistry};
//!
//! let config = GatewayConfig::from_yaml_file("zest.yaml")?;
//! let service = config.build_service(&ProviderRegistry::with_defaults())?;
//!
//! let result = service.generate(request).await?;
//! println!("{} via {}", result.html, result.provider_used);
//! ```

pub mod config;
pub mod deadline;
pub mod providers;
pub mod router;
pub mod service;

pub use config::{
    ConfigError, GatewayConfig, ModerationConfig, ProviderEntry, DEFAULT_GENERATION_TIMEOUT,
    MAX_GENERATION_TIMEOUT,
};
pub use deadline::Deadline;
pub use providers::{
    LlmProvider, ModelInfo, ProviderError, ProviderFactory, ProviderInfo, ProviderRegistry,
};
pub use router::{
    AttemptFailure, ProviderRouter, RoutedGeneration, RoutingError, MAX_FALLBACK_ATTEMPTS,
};
pub use service::{
    GenerationService, GenerationServiceBuilder, ModelsResponse, ServiceError, ServiceErrorKind,
};
