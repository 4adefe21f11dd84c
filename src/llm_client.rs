use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A chat-completion backend. Returns the text of the first completion.
#[async_trait]
pub trait LLMClient: Send + Sync {
    async fn complete(&self, model: &str, messages: &[ChatMessage], temperature: f32) -> Result<String>;
    fn get_model_name(&self) -> String;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Replays scripted replies in order and records every prompt it receives.
    pub struct MockLLMClient {
        responses: Mutex<Vec<Result<String, String>>>,
        pub prompts: Mutex<Vec<Vec<ChatMessage>>>,
        pub temperatures: Mutex<Vec<f32>>,
    }

    impl MockLLMClient {
        pub fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().map(|r| Ok(r.to_string())).collect()),
                prompts: Mutex::new(Vec::new()),
                temperatures: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                responses: Mutex::new(vec![Err(message.to_string())]),
                prompts: Mutex::new(Vec::new()),
                temperatures: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LLMClient for MockLLMClient {
        async fn complete(&self, _model: &str, messages: &[ChatMessage], temperature: f32) -> Result<String> {
            self.prompts.lock().unwrap().push(messages.to_vec());
            self.temperatures.lock().unwrap().push(temperature);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Ok("Mock response".to_string());
            }
            responses.remove(0).map_err(|e| anyhow::anyhow!(e))
        }

        fn get_model_name(&self) -> String {
            "mock-model".to_string()
        }
    }
}
