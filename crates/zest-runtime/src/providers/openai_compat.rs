//! OpenAI-compatible chat completions, spoken by GLM and Copilot.

use serde::{Deserialize, Serialize};
use zest_core::{prompts, GenerationRequest};

use super::{http, ProviderError};
use crate::deadline::Deadline;

pub(crate) const TEMPERATURE: f32 = 0.7;
pub(crate) const MAX_TOKENS: u32 = 8192;

/// A chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub(crate) struct ChatMessage {
    /// "system", "user" or "assistant"
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    /// System + user messages for a generation request.
    pub fn for_generation(model: impl Into<String>, request: &GenerationRequest) -> Self {
        Self {
            model: model.into(),
            messages: vec![
                ChatMessage::system(prompts::system_prompt(request)),
                ChatMessage::user(prompts::user_prompt(request)),
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl ChatResponse {
    /// Text of the first choice.
    pub fn into_content(self, provider: &str) -> Result<String, ProviderError> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::EmptyResponse(format!("{}: empty choices", provider)))
    }
}

/// POST a chat completion and return the first choice's text.
pub(crate) async fn send_chat(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    bearer: &str,
    extra_headers: &[(&str, &str)],
    body: &ChatRequest,
    deadline: &Deadline,
) -> Result<String, ProviderError> {
    let timeout = http::call_timeout(deadline)?;

    let mut builder = client
        .post(url)
        .bearer_auth(bearer)
        .timeout(timeout)
        .json(body);
    for (name, value) in extra_headers {
        builder = builder.header(*name, *value);
    }

    let response = builder
        .send()
        .await
        .map_err(|e| http::send_error(e, timeout))?;

    if !response.status().is_success() {
        return Err(http::status_error(response).await);
    }

    let body: ChatResponse = response
        .json()
        .await
        .map_err(|e| ProviderError::ParseError(e.to_string()))?;

    body.into_content(provider)
}
