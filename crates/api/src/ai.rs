//! Client for the Anthropic Messages API, used to draft blog posts.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::AiConfig;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MAX_TOKENS: u32 = 4096;
/// Backoff before retrying overload and server errors.
const RETRY_DELAYS_SECS: [u64; 2] = [1, 3];

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Anthropic API returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Response contained no text")]
    EmptyResponse,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `None` when no API key is configured.
    pub fn from_config(config: &AiConfig) -> Option<Self> {
        let key = config.api_key.as_deref()?;
        Some(Self::new(key, &config.model, &config.base_url))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one user prompt and return the concatenated text of the reply.
    #[tracing::instrument(skip_all, fields(model = %self.model))]
    pub async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String, AiError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: DEFAULT_MAX_TOKENS,
            system,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let mut attempt = 0;
        loop {
            match self.try_send(&body).await {
                Err(AiError::HttpStatus { status, body: text })
                    if is_retryable(status) && attempt < RETRY_DELAYS_SECS.len() =>
                {
                    tracing::warn!(status, attempt = attempt + 1, body = %text, "Anthropic request failed, retrying");
                    tokio::time::sleep(Duration::from_secs(RETRY_DELAYS_SECS[attempt])).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_send(&self, body: &MessagesRequest<'_>) -> Result<String, AiError> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AiError::HttpStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: MessagesResponse = response.json().await?;
        extract_text(parsed)
    }
}

fn is_retryable(status: u16) -> bool {
    status == 429 || status == 529 || status >= 500
}

fn extract_text(response: MessagesResponse) -> Result<String, AiError> {
    let text: String = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        return Err(AiError::EmptyResponse);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_blocks_are_joined() {
        let response: MessagesResponse = serde_json::from_value(serde_json::json!({
            "content": [
                {"type": "text", "text": "Hello, "},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "world"}
            ]
        }))
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "Hello, world");
    }

    #[test]
    fn empty_reply_is_an_error() {
        let response = MessagesResponse { content: vec![] };
        assert!(matches!(extract_text(response), Err(AiError::EmptyResponse)));
    }

    #[test]
    fn request_shape() {
        let body = MessagesRequest {
            model: "m",
            max_tokens: 10,
            system: None,
            messages: vec![Message {
                role: "user",
                content: "hi",
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn disabled_without_key() {
        let config = AiConfig {
            api_key: None,
            model: "m".into(),
            base_url: "http://localhost".into(),
        };
        assert!(AnthropicClient::from_config(&config).is_none());
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable(529));
        assert!(is_retryable(503));
        assert!(!is_retryable(400));
    }
}
