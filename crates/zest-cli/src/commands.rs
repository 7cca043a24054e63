//! Command implementations.
//!
//! Every command prints one document on stdout (JSON, or YAML for
//! `check-config`) and returns the process exit code. Logs go to stderr.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use zest_core::{
    normalizer, parse_generation_request, parse_moderation_request, ErrorResponse,
    ModerationRequest, OutputFormat,
};
use zest_runtime::{GatewayConfig, GenerationService, ProviderRegistry, ServiceError, ServiceErrorKind};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_INVALID_REQUEST: i32 = 2;
pub const EXIT_REJECTED: i32 = 3;
pub const EXIT_UNAVAILABLE: i32 = 4;

/// Which pipeline entry point a request goes through.
#[derive(Debug, Clone, Copy)]
pub enum Mode {
    Generate,
    Refine,
}

pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig> {
    match path {
        Some(path) => GatewayConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(GatewayConfig::default()),
    }
}

pub fn build_service(config: &GatewayConfig) -> Result<GenerationService> {
    config
        .build_service(&ProviderRegistry::with_defaults())
        .context("Failed to build generation service")
}

/// Read a file, or stdin for "-".
fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn exit_code(kind: ServiceErrorKind) -> i32 {
    match kind {
        ServiceErrorKind::InvalidRequest => EXIT_INVALID_REQUEST,
        ServiceErrorKind::Rejected => EXIT_REJECTED,
        ServiceErrorKind::Unavailable => EXIT_UNAVAILABLE,
    }
}

/// Generate or refine from a request file.
pub async fn execute_request(service: &GenerationService, mode: Mode, path: &Path) -> Result<i32> {
    let body = read_input(path)?;

    let request = match parse_generation_request(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid generation request");
            print_json(&ErrorResponse::new(e.to_string()))?;
            return Ok(EXIT_INVALID_REQUEST);
        }
    };

    let outcome = match mode {
        Mode::Generate => service.generate(request).await,
        Mode::Refine => service.refine(request).await,
    };

    match outcome {
        Ok(result) => {
            print_json(&result)?;
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            report_service_error(&e)?;
            Ok(exit_code(e.kind()))
        }
    }
}

fn report_service_error(error: &ServiceError) -> Result<()> {
    match error.to_result() {
        Some(result) => print_json(&result),
        None => print_json(&ErrorResponse::new(error.user_message())),
    }
}

/// Moderation pre-check from a prompt or a request file.
pub fn execute_moderate(
    service: &GenerationService,
    prompt: Option<String>,
    request: Option<PathBuf>,
) -> Result<i32> {
    let request = match (prompt, request) {
        (Some(prompt), _) => ModerationRequest {
            prompt,
            ..Default::default()
        },
        (None, Some(path)) => match parse_moderation_request(&read_input(&path)?) {
            Ok(request) => request,
            Err(e) => {
                print_json(&ErrorResponse::new(e.to_string()))?;
                return Ok(EXIT_INVALID_REQUEST);
            }
        },
        (None, None) => anyhow::bail!("either --prompt or --request is required"),
    };

    let result = service.moderate(&request);
    print_json(&result)?;
    Ok(if result.allowed { EXIT_SUCCESS } else { EXIT_REJECTED })
}

pub fn execute_models(service: &GenerationService) -> Result<i32> {
    print_json(&service.models_response())?;
    Ok(EXIT_SUCCESS)
}

pub fn execute_normalize(input: &Path, format: OutputFormat) -> Result<i32> {
    let raw = read_input(input)?;
    print_json(&normalizer::parse(&raw, format))?;
    Ok(EXIT_SUCCESS)
}

/// Validate every provider entry, then print the effective configuration.
pub fn execute_check_config(config: &GatewayConfig) -> Result<i32> {
    let registry = ProviderRegistry::with_defaults();
    if let Err(e) = config.validate_providers(&registry) {
        print_json(&ErrorResponse::new(e.to_string()))?;
        return Ok(EXIT_FAILURE);
    }

    let service = config
        .build_service(&registry)
        .context("Failed to build generation service")?;
    for provider in service.models() {
        tracing::info!(provider = %provider.name, enabled = provider.enabled, "Provider");
    }

    print!("{}", serde_yaml::to_string(config)?);
    Ok(EXIT_SUCCESS)
}
