//! HTTP plumbing shared by the reqwest-based backends.

use std::time::Duration;

use super::ProviderError;
use crate::deadline::Deadline;

/// Upper bound for a single backend call, on top of the shared deadline.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the HTTP client a provider keeps for its lifetime.
pub(crate) fn build_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| ProviderError::HttpError(format!("failed to build HTTP client: {}", e)))
}

/// Remaining budget for the next call; fails fast once it is used up.
pub(crate) fn call_timeout(deadline: &Deadline) -> Result<Duration, ProviderError> {
    let remaining = deadline.remaining();
    if remaining.is_zero() {
        return Err(ProviderError::Timeout(Duration::ZERO));
    }
    Ok(remaining)
}

/// Map a transport error. URLs are stripped so query parameters never leak.
pub(crate) fn send_error(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout)
    } else {
        ProviderError::HttpError(err.without_url().to_string())
    }
}

/// Turn a non-success response into a provider error.
pub(crate) async fn status_error(response: reqwest::Response) -> ProviderError {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        return ProviderError::RateLimited { retry_after };
    }

    let body = response.text().await.unwrap_or_default();
    let message = body.trim().to_string();

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return ProviderError::AuthError(format!("status {}: {}", status.as_u16(), message));
    }

    ProviderError::ApiError {
        status: status.as_u16(),
        message,
    }
}
