// src/integrations/types.rs — Messaging transport traits

use async_trait::async_trait;
use std::path::Path;

use crate::core::types::{ChatId, InboundEvent, OutboundReply};

/// One item fetched from the platform. `event` is `None` for updates the
/// gateway ignores (edits, stickers, channel posts, ...), which still have to
/// be acknowledged through the offset.
#[derive(Debug, Clone)]
pub struct PolledUpdate {
    pub update_id: i64,
    pub event: Option<InboundEvent>,
}

/// Outbound side of a messaging platform.
#[async_trait]
pub trait MessagingAdapter: Send + Sync {
    async fn send(&self, chat: ChatId, reply: &OutboundReply) -> anyhow::Result<()>;
}

/// Fetches a file attached to an inbound message.
#[async_trait]
pub trait FileDownloader: Send + Sync {
    async fn download(&self, file_id: &str, dest: &Path) -> anyhow::Result<()>;
}

/// Inbound side of a messaging platform (long polling).
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn poll_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> anyhow::Result<Vec<PolledUpdate>>;
}
