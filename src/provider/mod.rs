// src/provider/mod.rs — Language model and speech-to-text provider layer

pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::infra::errors::GatewayError;

/// Conversational model: takes the ordered transcript, returns the next turn.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn id(&self) -> &str;

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, GatewayError>;
}

/// Speech-to-text: turns an audio file into recognised text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<String, GatewayError>;
}

#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub system: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    /// `None` when the provider answered without a usable message.
    pub content: Option<String>,
    pub usage: TokenUsage,
}

impl ChatResponse {
    /// Non-empty assistant content, if any.
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::system("s").role, Role::System);
        let m = Message::user("Hello");
        assert_eq!(m.role, Role::User);
        assert_eq!(m.content, "Hello");
        assert_eq!(Message::assistant("Sure!").role, Role::Assistant);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("x")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"x"}"#);
    }

    #[test]
    fn test_response_text_filters_empty() {
        let none = ChatResponse::default();
        assert!(none.text().is_none());

        let blank = ChatResponse {
            content: Some("  \n".into()),
            ..Default::default()
        };
        assert!(blank.text().is_none());

        let ok = ChatResponse {
            content: Some("Hi there".into()),
            ..Default::default()
        };
        assert_eq!(ok.text(), Some("Hi there"));
    }

    #[test]
    fn test_token_usage_total() {
        let u = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
        };
        assert_eq!(u.total(), 150);
        assert_eq!(TokenUsage::default().total(), 0);
    }
}
