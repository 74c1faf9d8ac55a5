//! Async LLM client
//!
//! Model-agnostic HTTP client for chat-completion APIs. Speaks both the
//! Anthropic messages format and the OpenAI-compatible format (DeepSeek,
//! local servers); the format is picked from the URL.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, TownError};

const DEFAULT_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFormat {
    Anthropic,
    OpenAI,
}

impl ApiFormat {
    fn detect(url: &str) -> Self {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            ApiFormat::OpenAI
        }
    }
}

pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    api_format: ApiFormat,
    max_tokens: u32,
}

impl LlmClient {
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            api_format: ApiFormat::detect(&api_url),
            client,
            api_key,
            api_url,
            model,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Create a client from environment variables
    ///
    /// Required: LLM_API_KEY
    /// Optional: LLM_API_URL (defaults to the Anthropic messages API)
    /// Optional: LLM_MODEL
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| TownError::Cognition("LLM_API_KEY not set".into()))?;
        let api_url = std::env::var("LLM_API_URL").unwrap_or_else(|_| DEFAULT_URL.into());
        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
        Ok(Self::new(api_key, api_url, model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn api_format(&self) -> ApiFormat {
        self.api_format
    }

    /// Send one system + user exchange and return the answer text
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = self
            .client
            .post(&self.api_url)
            .header("content-type", "application/json");

        let request = match self.api_format {
            ApiFormat::Anthropic => request
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .json(&AnthropicRequest {
                    model: &self.model,
                    max_tokens: self.max_tokens,
                    system,
                    messages: vec![Message { role: "user", content: user }],
                }),
            ApiFormat::OpenAI => request
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&OpenAIRequest {
                    model: &self.model,
                    max_tokens: self.max_tokens,
                    messages: vec![
                        Message { role: "system", content: system },
                        Message { role: "user", content: user },
                    ],
                }),
        };

        let response = request.send().await.map_err(transport)?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(TownError::Cognition(format!("API error {}: {}", status, error_text)));
        }

        let text = match self.api_format {
            ApiFormat::Anthropic => response
                .json::<AnthropicResponse>()
                .await
                .map_err(transport)?
                .content
                .into_iter()
                .next()
                .map(|c| c.text),
            ApiFormat::OpenAI => response
                .json::<OpenAIResponse>()
                .await
                .map_err(transport)?
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content),
        };
        text.ok_or_else(|| TownError::Cognition("Empty response".into()))
    }
}

fn transport(e: reqwest::Error) -> TownError {
    TownError::Cognition(e.to_string())
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}
