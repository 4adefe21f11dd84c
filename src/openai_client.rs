use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::llm_client::{ChatMessage, LLMClient};

/// Which OpenAI-compatible service the client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatProvider {
    OpenAI,
    OpenRouter,
}

/// OpenAI-compatible API client configuration
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub provider: ChatProvider,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

impl OpenAIConfig {
    /// Build from the application config, or `None` when no usable key is set
    pub fn from_app_config(config: &Config) -> Option<Self> {
        let provider = match config.llm.provider.as_str() {
            "openai" => ChatProvider::OpenAI,
            "openrouter" => ChatProvider::OpenRouter,
            _ => return None,
        };
        let settings = config.llm_provider()?;
        let api_key = config.get_llm_api_key()?;

        Some(Self {
            provider,
            api_key,
            model: settings.model.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            max_tokens: Some(1024),
            timeout: Duration::from_secs(config.dispatch.http_timeout_secs),
        })
    }
}

/// OpenAI-compatible chat completions client
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIClient {
    /// Create a new client
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(anyhow::anyhow!("API key is required for {:?}", config.provider));
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { config, client })
    }

    fn convert_messages(&self, messages: &[ChatMessage]) -> Vec<OpenAIMessage> {
        messages
            .iter()
            .map(|msg| OpenAIMessage {
                role: msg.role.as_str().to_string(),
                content: msg.content.clone(),
            })
            .collect()
    }
}

/// Build the configured client; `None` means the parser runs in fallback mode
pub fn create_llm_client(config: &Config) -> Option<Arc<dyn LLMClient>> {
    let client_config = OpenAIConfig::from_app_config(config)?;
    match OpenAIClient::new(client_config) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            log::warn!("Language model client unavailable: {}", e);
            None
        }
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn complete(&self, model: &str, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        let request_body = OpenAIRequest {
            model: model.to_string(),
            messages: self.convert_messages(messages),
            max_tokens: self.config.max_tokens,
            temperature: Some(temperature),
            stream: Some(false),
        };

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json");

        if self.config.provider == ChatProvider::OpenRouter {
            request = request
                .header("HTTP-Referer", "https://github.com/yourusername/taskwright")
                .header("X-Title", "taskwright");
        }

        let response = request.json(&request_body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow::anyhow!("{:?} API error {}: {}", self.config.provider, status, error_text));
        }

        let openai_response: OpenAIResponse = response.json().await?;

        openai_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("No response from {:?}", self.config.provider))
    }

    fn get_model_name(&self) -> String {
        self.config.model.clone()
    }
}

// OpenAI API request/response structures
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIReplyMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIReplyMessage {
    content: Option<String>,
}
