//! OpenAI-compatible chat-completions content backend.
//!
//! Talks to `POST {base_url}/chat/completions`. HTTP status codes map onto
//! the error taxonomy: 401/403 are authentication failures, 429 is a rate
//! limit, everything else is transient.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use super::ContentBackend;
use crate::error::{AgentError, AgentResult};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Content backend calling an OpenAI-compatible HTTP API
pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> AgentResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AgentError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Build from `OPENAI_API_KEY` (and optional `OPENAI_BASE_URL`)
    pub fn from_env(model: impl Into<String>) -> AgentResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AgentError::Configuration("OPENAI_API_KEY is not set".to_string()))?;

        let backend = Self::new(api_key, model)?;
        Ok(match std::env::var("OPENAI_BASE_URL") {
            Ok(url) => backend.with_base_url(url),
            Err(_) => backend,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Map a non-success HTTP status onto the error taxonomy
pub fn classify_status(status: StatusCode, detail: &str) -> AgentError {
    let message = format!("HTTP {}: {}", status.as_u16(), detail.trim());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(message),
        _ => AgentError::Transient(message),
    }
}

#[async_trait]
impl ContentBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32) -> AgentResult<String> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": max_tokens,
            "temperature": temperature,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Transient(format!("Request to content backend failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &detail));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Transient(format!("Malformed completion response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AgentError::Transient("Completion response had no content".to_string()))
    }
}
