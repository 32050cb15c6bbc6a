// src/provider/openai.rs — OpenAI Chat + Whisper transcription provider

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;

use super::{ChatProvider, ChatRequest, ChatResponse, Message, Role, TokenUsage, Transcriber};
use crate::infra::config::OpenAIConfig;
use crate::infra::errors::GatewayError;

const PROVIDER_ID: &str = "openai";

pub struct OpenAIProvider {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
    transcription_model: String,
}

impl OpenAIProvider {
    pub fn with_base_url(api_key: String, base_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            transcription_model: "whisper-1".into(),
        }
    }

    pub fn from_config(config: &OpenAIConfig) -> Result<Self, GatewayError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| GatewayError::Config("openai.api_key is not set".into()))?;
        let mut provider =
            Self::with_base_url(api_key, config.base_url.clone(), config.timeout());
        provider.transcription_model = config.transcription_model.clone();
        Ok(provider)
    }

    fn request_error(e: reqwest::Error) -> GatewayError {
        GatewayError::Provider {
            provider: PROVIDER_ID.into(),
            message: if e.is_timeout() {
                format!("request timed out: {e}")
            } else {
                e.to_string()
            },
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GatewayError::RateLimited {
                provider: PROVIDER_ID.into(),
            });
        }
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Provider {
                provider: PROVIDER_ID.into(),
                message: format!("HTTP {}: {}", status, error_body),
            });
        }
        Ok(response)
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

pub(crate) fn build_chat_body(request: &ChatRequest) -> serde_json::Value {
    let system = request.system.as_deref().map(Message::system);
    let msgs: Vec<serde_json::Value> = system
        .iter()
        .chain(&request.messages)
        .map(|m| {
            serde_json::json!({
                "role": role_name(m.role),
                "content": m.content,
            })
        })
        .collect();

    serde_json::json!({
        "model": request.model,
        "messages": msgs,
    })
}

/// Extract the first choice. A missing or null `message.content` is kept as
/// `None` so the caller can treat it as a malformed answer.
pub(crate) fn parse_chat_response(resp: &serde_json::Value) -> ChatResponse {
    let content = resp["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string);

    let usage = TokenUsage {
        input_tokens: resp["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: resp["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    };

    ChatResponse { content, usage }
}

#[async_trait]
impl ChatProvider for OpenAIProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, GatewayError> {
        let body = build_chat_body(&request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(Self::request_error)?;

        let response = Self::check_status(response).await?;

        let resp: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| GatewayError::MalformedResponse {
                    provider: PROVIDER_ID.into(),
                    message: format!("Failed to parse response: {}", e),
                })?;

        let parsed = parse_chat_response(&resp);
        tracing::debug!(
            model = %request.model,
            tokens = parsed.usage.total(),
            "chat completion received"
        );
        Ok(parsed)
    }
}

#[async_trait]
impl Transcriber for OpenAIProvider {
    async fn transcribe(&self, audio: &Path) -> Result<String, GatewayError> {
        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("voice.mp3")
            .to_string();

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")
            .map_err(Self::request_error)?;
        let form = Form::new()
            .text("model", self.transcription_model.clone())
            .part("file", part);

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(Self::request_error)?;

        let response = Self::check_status(response).await?;

        let resp: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| GatewayError::MalformedResponse {
                    provider: PROVIDER_ID.into(),
                    message: format!("Failed to parse transcription: {}", e),
                })?;

        resp["text"]
            .as_str()
            .map(|t| t.trim().to_string())
            .ok_or_else(|| GatewayError::MalformedResponse {
                provider: PROVIDER_ID.into(),
                message: "transcription response has no text".into(),
            })
    }
}
