// src/core/types.rs — Inbound events and outbound replies

use std::fmt;

/// Telegram user identity. Sessions are keyed by this.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chat that replies are delivered to.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bot commands that apply in any flow state.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Command {
    New,
    Start,
}

impl Command {
    /// Parse `/new`, `/start` and the `/new@botname` form. Anything else,
    /// including unknown slash commands, is ordinary text.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim().split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split_once('@').map_or(name, |(n, _)| n);
        match name {
            "new" => Some(Command::New),
            "start" => Some(Command::Start),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Command(Command),
    Text(String),
    Voice { file_id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub user: UserId,
    pub chat: ChatId,
    pub kind: EventKind,
}

impl InboundEvent {
    /// Build a text event, promoting recognised commands.
    pub fn from_text(user: UserId, chat: ChatId, text: impl Into<String>) -> Self {
        let text = text.into();
        let kind = match Command::parse(&text) {
            Some(cmd) => EventKind::Command(cmd),
            None => EventKind::Text(text),
        };
        Self { user, chat, kind }
    }

    pub fn voice(user: UserId, chat: ChatId, file_id: impl Into<String>) -> Self {
        Self {
            user,
            chat,
            kind: EventKind::Voice {
                file_id: file_id.into(),
            },
        }
    }
}

/// A single message sent back to the user.
#[derive(Clone, PartialEq)]
pub enum OutboundReply {
    Text(String),
    /// Rendered in a monospace code entity.
    Code(String),
    /// Decoded image bytes.
    Photo(Vec<u8>),
}

impl fmt::Debug for OutboundReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutboundReply::Text(t) => f.debug_tuple("Text").field(t).finish(),
            OutboundReply::Code(t) => f.debug_tuple("Code").field(t).finish(),
            OutboundReply::Photo(bytes) => write!(f, "Photo({} bytes)", bytes.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("/new"), Some(Command::New));
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("  /start  "), Some(Command::Start));
        assert_eq!(Command::parse("/new@chatgate_bot"), Some(Command::New));
        assert_eq!(Command::parse("/start payload"), Some(Command::Start));
    }

    #[test]
    fn test_command_parse_rejects_other_text() {
        assert_eq!(Command::parse("new"), None);
        assert_eq!(Command::parse("/help"), None);
        assert_eq!(Command::parse("/newer"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn test_from_text_promotes_commands() {
        let e = InboundEvent::from_text(UserId(1), ChatId(1), "/new");
        assert_eq!(e.kind, EventKind::Command(Command::New));

        let e = InboundEvent::from_text(UserId(1), ChatId(1), "hello");
        assert_eq!(e.kind, EventKind::Text("hello".into()));
    }

    #[test]
    fn test_photo_debug_hides_bytes() {
        let r = OutboundReply::Photo(vec![0; 2048]);
        assert_eq!(format!("{r:?}"), "Photo(2048 bytes)");
    }
}
