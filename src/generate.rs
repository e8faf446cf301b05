//! Server-side proxy for the Anthropic Messages API.
//!
//! The API key lives only on the server; clients post a prompt and get the
//! generated HTML back. Upstream errors are passed through with the
//! provider's own message where available.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, Result};

const ANTHROPIC_API: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 16000;

/// Generation can take a while for long pages.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenerationProxy {
    client: Client,
    api_key: String,
    model: String,
}

impl GenerationProxy {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(ANTHROPIC_API)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&json!({
                "model": self.model,
                "max_tokens": MAX_TOKENS,
                "messages": [{"role": "user", "content": prompt}],
            }))
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Generation API error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| {
                    v.get("error")
                        .and_then(|e| e.get("message"))
                        .and_then(|m| m.as_str())
                        .map(String::from)
                })
                .unwrap_or_else(|| format!("Generation API error {}", status));
            return Err(AppError::Provider(message));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Invalid generation response: {}", e)))?;

        let text = body
            .content
            .first()
            .and_then(|block| block.text.as_deref())
            .map(str::trim)
            .unwrap_or_default();

        if text.is_empty() {
            return Err(AppError::Provider("Empty response from generation API".into()));
        }

        Ok(text.to_string())
    }
}
