// src/integrations/telegram.rs — Telegram adapter (Bot API)
//
// Uses the Telegram Bot API (https://core.telegram.org/bots/api) with
// getUpdates long polling.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::core::types::{ChatId, InboundEvent, OutboundReply, UserId};
use crate::integrations::types::{FileDownloader, MessagingAdapter, PolledUpdate, UpdateSource};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Slack on top of the long-poll timeout before the HTTP request gives up.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Bound for every other Bot API call, file downloads included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// sendMessage limit, in UTF-16 code units.
const MAX_MESSAGE_UTF16: usize = 4096;

/// Telegram integration adapter.
pub struct TelegramAdapter {
    client: Client,
    bot_token: String,
    api_base: String,
}

impl TelegramAdapter {
    pub fn new(bot_token: String) -> Self {
        Self::with_api_base(bot_token, TELEGRAM_API_BASE.into())
    }

    /// Point the adapter at a self-hosted Bot API server.
    pub fn with_api_base(bot_token: String, api_base: String) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            bot_token,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{file_path}", self.api_base, self.bot_token)
    }

    /// Validate the bot token by calling getMe.
    pub async fn validate(&self) -> anyhow::Result<String> {
        #[derive(Deserialize)]
        struct BotUser {
            username: Option<String>,
            first_name: Option<String>,
        }

        let resp: TelegramResponse<BotUser> = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await?
            .json()
            .await?;

        let bot = resp.into_result("getMe")?;
        Ok(format!(
            "Authenticated as @{}",
            bot.username
                .unwrap_or_else(|| bot.first_name.unwrap_or_default())
        ))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> anyhow::Result<T> {
        let resp: TelegramResponse<T> = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await?
            .json()
            .await?;
        resp.into_result(method)
    }
}

// -- Telegram API response types --

#[derive(Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> TelegramResponse<T> {
    fn into_result(self, method: &str) -> anyhow::Result<T> {
        if !self.ok {
            anyhow::bail!(
                "Telegram {method} failed: {}",
                self.description.unwrap_or_else(|| "unknown".into())
            );
        }
        self.result
            .ok_or_else(|| anyhow::anyhow!("Telegram {method} returned no result"))
    }
}

#[derive(Deserialize)]
struct TgUpdate {
    update_id: i64,
    message: Option<TgMessage>,
}

#[derive(Deserialize)]
struct TgMessage {
    chat: TgChat,
    from: Option<TgUser>,
    text: Option<String>,
    voice: Option<TgVoice>,
}

#[derive(Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Deserialize)]
struct TgUser {
    id: i64,
}

#[derive(Deserialize)]
struct TgVoice {
    file_id: String,
}

#[derive(Deserialize)]
struct TgFile {
    file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {}

/// Turn a raw update into an inbound event. Only text and voice messages
/// with a sender are routed.
fn event_from_update(update: TgUpdate) -> Option<InboundEvent> {
    let message = update.message?;
    let user = UserId(message.from?.id);
    let chat = ChatId(message.chat.id);

    if let Some(voice) = message.voice {
        return Some(InboundEvent::voice(user, chat, voice.file_id));
    }
    message
        .text
        .map(|text| InboundEvent::from_text(user, chat, text))
}

/// Build the sendMessage body. Code replies carry a single `code` entity
/// spanning the whole text; Telegram measures it in UTF-16 units.
fn message_body(chat: ChatId, text: &str, as_code: bool) -> serde_json::Value {
    let mut body = serde_json::json!({
        "chat_id": chat.0,
        "text": text,
    });
    if as_code {
        body["entities"] = serde_json::json!([{
            "type": "code",
            "offset": 0,
            "length": text.encode_utf16().count(),
        }]);
    }
    body
}

/// Split `text` into pieces of at most `limit` UTF-16 units, breaking after
/// the last newline that fits when there is one.
fn split_message(text: &str, limit: usize) -> Vec<&str> {
    if text.is_empty() {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let mut units = 0;
        let mut end = rest.len();
        let mut after_newline = None;
        for (i, c) in rest.char_indices() {
            if units + c.len_utf16() > limit {
                end = i;
                break;
            }
            units += c.len_utf16();
            if c == '\n' {
                after_newline = Some(i + 1);
            }
        }
        if end < rest.len() {
            end = after_newline.unwrap_or(end);
        }

        let (head, tail) = rest.split_at(end);
        chunks.push(head);
        rest = tail;
    }
    chunks
}

// -- Transport trait implementations --

#[async_trait]
impl UpdateSource for TelegramAdapter {
    async fn poll_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> anyhow::Result<Vec<PolledUpdate>> {
        let mut body = serde_json::json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            body["offset"] = serde_json::json!(offset);
        }

        let resp: TelegramResponse<Vec<TgUpdate>> = self
            .client
            .post(self.api_url("getUpdates"))
            .timeout(Duration::from_secs(timeout_secs) + POLL_GRACE)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        let updates = resp
            .into_result("getUpdates")?
            .into_iter()
            .map(|u| PolledUpdate {
                update_id: u.update_id,
                event: event_from_update(u),
            })
            .collect();

        Ok(updates)
    }
}

#[async_trait]
impl MessagingAdapter for TelegramAdapter {
    async fn send(&self, chat: ChatId, reply: &OutboundReply) -> anyhow::Result<()> {
        match reply {
            OutboundReply::Text(text) | OutboundReply::Code(text) => {
                let as_code = matches!(reply, OutboundReply::Code(_));
                for chunk in split_message(text, MAX_MESSAGE_UTF16) {
                    let _: SentMessage = self
                        .call("sendMessage", &message_body(chat, chunk, as_code))
                        .await?;
                }
            }
            OutboundReply::Photo(bytes) => {
                let part = Part::bytes(bytes.clone())
                    .file_name("image.png")
                    .mime_str("image/png")?;
                let form = Form::new()
                    .text("chat_id", chat.0.to_string())
                    .part("photo", part);

                let resp: TelegramResponse<SentMessage> = self
                    .client
                    .post(self.api_url("sendPhoto"))
                    .multipart(form)
                    .send()
                    .await?
                    .json()
                    .await?;
                resp.into_result("sendPhoto")?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl FileDownloader for TelegramAdapter {
    async fn download(&self, file_id: &str, dest: &Path) -> anyhow::Result<()> {
        let file: TgFile = self
            .call("getFile", &serde_json::json!({ "file_id": file_id }))
            .await?;
        let file_path = file
            .file_path
            .ok_or_else(|| anyhow::anyhow!("Telegram getFile returned no file_path"))?;

        let response = self.client.get(self.file_url(&file_path)).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Telegram file download failed: HTTP {}", response.status());
        }
        let bytes = response.bytes().await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &bytes).await?;
        tracing::debug!(bytes = bytes.len(), path = %dest.display(), "voice file downloaded");
        Ok(())
    }
}
