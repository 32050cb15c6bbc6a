// src/core/router.rs — Conversation router
//
// Handles one inbound event for one user: consults the session, dispatches to
// the chat / transcription / image backends, and emits replies in the order
// their steps complete. Transcript entries are committed only after the chat
// backend answered with usable content and that answer reached the user.

use std::sync::Arc;
use std::time::Duration;

use crate::audio::VoicePreparer;
use crate::core::flow::{self, FlowAction, GenerationParams};
use crate::core::session::SessionStore;
use crate::core::types::{ChatId, Command, EventKind, InboundEvent, OutboundReply, UserId};
use crate::imagegen::{decode_image, ImageGenerator, Txt2ImgRequest};
use crate::infra::config::Config;
use crate::infra::errors::GatewayError;
use crate::integrations::types::MessagingAdapter;
use crate::provider::{ChatProvider, ChatRequest, Message, Transcriber};

pub const GREETING: &str = "Waiting for your voice or text message";
pub const TEXT_RECEIVED: &str = "Message received. Waiting for the server response...";
pub const VOICE_RECEIVED: &str = "Message received. Waiting for the server response... \
     (If no answer arrives within 30 seconds, try rephrasing the request or send /new)";
pub const ASK_PROMPT: &str = "Please enter your prompt:";
pub const ASK_NEGATIVE_PROMPT: &str = "Please enter your negative prompt:";
pub const ASK_PARAMS: &str =
    "Enter steps count, cfg scale, and denoising strength in the format \"X X X.XX\":";
pub const PARAMS_INVALID: &str = "Could not read the parameters. Send three numbers: \
     steps (integer), cfg scale (integer) and denoising strength (decimal), e.g. \"20 7 0.75\":";
pub const GENERATION_STARTED: &str = "Image generation started...";
pub const GENERATION_COMPLETED: &str = "Image generation completed.";

/// The external collaborators the router calls out to.
pub struct Backends {
    pub chat: Arc<dyn ChatProvider>,
    pub transcriber: Arc<dyn Transcriber>,
    pub images: Arc<dyn ImageGenerator>,
    pub voice: Arc<dyn VoicePreparer>,
}

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub chat_model: String,
    pub system_prompt: Option<String>,
    pub image_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            chat_model: "gpt-3.5-turbo".into(),
            system_prompt: None,
            image_timeout: Duration::from_secs(300),
        }
    }
}

impl From<&Config> for RouterConfig {
    fn from(config: &Config) -> Self {
        Self {
            chat_model: config.openai.chat_model.clone(),
            system_prompt: config.openai.system_prompt.clone(),
            image_timeout: config.image.timeout(),
        }
    }
}

/// Replies bound for one chat.
struct Outbox<'a> {
    messenger: &'a dyn MessagingAdapter,
    chat: ChatId,
}

impl Outbox<'_> {
    async fn send(&self, reply: OutboundReply) -> Result<(), GatewayError> {
        self.messenger
            .send(self.chat, &reply)
            .await
            .map_err(|e| GatewayError::Messaging(e.to_string()))
    }

    async fn text(&self, text: impl Into<String>) -> Result<(), GatewayError> {
        self.send(OutboundReply::Text(text.into())).await
    }

    async fn code(&self, text: impl Into<String>) -> Result<(), GatewayError> {
        self.send(OutboundReply::Code(text.into())).await
    }
}

pub struct Router {
    store: Arc<SessionStore>,
    backends: Backends,
    config: RouterConfig,
}

impl Router {
    pub fn new(store: Arc<SessionStore>, backends: Backends, config: RouterConfig) -> Self {
        Self {
            store,
            backends,
            config,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Handle one event. Failures never escape: they are logged and the user
    /// gets a notice, and the session stays where the failure left it.
    pub async fn handle(&self, event: &InboundEvent, messenger: &dyn MessagingAdapter) {
        let out = Outbox {
            messenger,
            chat: event.chat,
        };

        if let Err(e) = self.process(event, &out).await {
            if e.is_backend() {
                tracing::warn!(user = %event.user, "Backend call failed: {e}");
            } else {
                tracing::error!(user = %event.user, "Error while processing event: {e}");
            }
            if let Err(send_err) = out.text(e.user_notice()).await {
                tracing::warn!(user = %event.user, "Failed to deliver error notice: {send_err}");
            }
        }
    }

    async fn process(&self, event: &InboundEvent, out: &Outbox<'_>) -> Result<(), GatewayError> {
        match &event.kind {
            EventKind::Command(cmd) => self.on_command(event.user, *cmd, out).await,
            EventKind::Text(text) => self.on_text(event.user, text, out).await,
            EventKind::Voice { file_id } => self.on_voice(event.user, file_id, out).await,
        }
    }

    async fn on_command(
        &self,
        user: UserId,
        cmd: Command,
        out: &Outbox<'_>,
    ) -> Result<(), GatewayError> {
        tracing::info!(user = %user, ?cmd, "session reset");
        self.store.reset(user);
        out.text(GREETING).await
    }

    async fn on_text(&self, user: UserId, text: &str, out: &Outbox<'_>) -> Result<(), GatewayError> {
        let state = self.store.get(user).state;
        let action = flow::plan(state, text);
        tracing::debug!(user = %user, ?state, ?action, "text event");

        if let Some(next) = action.next_state() {
            self.store.update(user, |s| s.state = next);
        }

        match action {
            FlowAction::StartImageFlow => out.code(ASK_PROMPT).await,
            FlowAction::StorePrompt(prompt) => {
                self.store.update(user, |s| s.prompt = Some(prompt));
                out.code(ASK_NEGATIVE_PROMPT).await
            }
            FlowAction::StoreNegativePrompt(negative) => {
                self.store.update(user, |s| s.negative_prompt = Some(negative));
                out.code(ASK_PARAMS).await
            }
            FlowAction::RepromptParams => out.code(PARAMS_INVALID).await,
            FlowAction::Generate(params) => self.generate(user, params, out).await,
            FlowAction::Chat(text) => {
                out.code(TEXT_RECEIVED).await?;
                self.chat_round_trip(user, &text, out).await
            }
        }
    }

    async fn on_voice(
        &self,
        user: UserId,
        file_id: &str,
        out: &Outbox<'_>,
    ) -> Result<(), GatewayError> {
        out.code(VOICE_RECEIVED).await?;

        let text = {
            let voice = self.backends.voice.prepare(file_id, user).await?;
            self.backends.transcriber.transcribe(voice.path()).await?
        };
        if text.trim().is_empty() {
            return Err(GatewayError::Provider {
                provider: "transcription".into(),
                message: "no speech recognised".into(),
            });
        }

        out.code(format!("Your request: {text}")).await?;
        self.chat_round_trip(user, &text, out).await
    }

    /// Send the transcript plus `text` to the chat backend; on a usable
    /// answer, relay it and then append USER and ASSISTANT. An answer that
    /// could not be delivered is not committed.
    async fn chat_round_trip(
        &self,
        user: UserId,
        text: &str,
        out: &Outbox<'_>,
    ) -> Result<(), GatewayError> {
        let mut messages = self.store.get(user).messages;
        messages.push(Message::user(text));

        let request = ChatRequest {
            model: self.config.chat_model.clone(),
            messages,
            system: self.config.system_prompt.clone(),
        };

        let response = self.backends.chat.chat(request).await?;
        let content = response
            .text()
            .ok_or_else(|| GatewayError::MalformedResponse {
                provider: self.backends.chat.id().to_string(),
                message: "response has no message content".into(),
            })?
            .to_string();

        out.text(content.clone()).await?;

        self.store.update(user, |s| {
            s.messages.push(Message::user(text));
            s.messages.push(Message::assistant(content));
        });
        Ok(())
    }

    async fn generate(
        &self,
        user: UserId,
        params: GenerationParams,
        out: &Outbox<'_>,
    ) -> Result<(), GatewayError> {
        let session = self.store.get(user);
        let request = Txt2ImgRequest::new(
            session.prompt.unwrap_or_default(),
            session.negative_prompt.unwrap_or_default(),
            params,
        );

        out.code(GENERATION_STARTED).await?;

        let backend = self.backends.images.id();
        let limit = self.config.image_timeout;
        let images = tokio::time::timeout(limit, self.backends.images.generate(&request))
            .await
            .map_err(|_| GatewayError::Timeout {
                operation: "Image generation".into(),
                seconds: limit.as_secs(),
            })?
            // Unreadable image responses get the generic notice, not the chat one.
            .map_err(|e| match e {
                GatewayError::MalformedResponse { message, .. } => GatewayError::Provider {
                    provider: backend.to_string(),
                    message,
                },
                other => other,
            })?;

        for encoded in &images {
            let bytes = decode_image(encoded)?;
            out.send(OutboundReply::Photo(bytes)).await?;
        }

        out.code(GENERATION_COMPLETED).await?;
        self.store.reset(user);
        tracing::info!(user = %user, backend, images = images.len(), "image flow completed");
        Ok(())
    }
}
