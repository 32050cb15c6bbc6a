// src/integrations/mod.rs — Messaging platform layer

pub mod telegram;
pub mod types;

pub use telegram::TelegramAdapter;
pub use types::{FileDownloader, MessagingAdapter, PolledUpdate, UpdateSource};
