//! Core types shared by the router, the session store and the transports.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Chat platform user id (numeric).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Chat platform chat id (numeric).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key of the session store: one user inside one chat.
///
/// The same user talking to the assistant in a private chat and in a group
/// has two independent conversations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId {
    pub user: UserId,
    pub chat: ChatId,
}

impl ConversationId {
    pub fn new(user: i64, chat: i64) -> Self {
        Self {
            user: UserId(user),
            chat: ChatId(chat),
        }
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user.0, self.chat.0)
    }
}

/// Kind of chat a message was received in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    /// Whether polls can be posted straight into this chat.
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group | Self::Supergroup)
    }
}

/// A text message delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub identity: ConversationId,
    pub chat_kind: ChatKind,
    pub text: String,
}

impl InboundMessage {
    /// A message sent in a one-to-one chat, where the chat id equals the user id.
    pub fn private(user: i64, text: impl Into<String>) -> Self {
        Self {
            identity: ConversationId::new(user, user),
            chat_kind: ChatKind::Private,
            text: text.into(),
        }
    }

    /// A message sent by `user` inside the group `chat`.
    pub fn group(user: i64, chat: i64, text: impl Into<String>) -> Self {
        Self {
            identity: ConversationId::new(user, chat),
            chat_kind: ChatKind::Group,
            text: text.into(),
        }
    }

    pub fn chat(&self) -> ChatId {
        self.identity.chat
    }
}

/// Reply keyboard made of button labels, one row per inner vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<String>>,
}

impl Keyboard {
    /// Lay the labels out two per row.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        Self {
            rows: labels.chunks(2).map(|row| row.to_vec()).collect(),
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(String::as_str)
    }
}

/// Something the assistant sends back to the chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Outbound {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        keyboard: Option<Keyboard>,
    },
    Image {
        url: String,
    },
}

impl Outbound {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self::Text {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self::Image { url: url.into() }
    }

    /// Text body, if this is a text message.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            Self::Image { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_two_per_row() {
        let keyboard = Keyboard::from_labels(["a", "b", "c"]);
        assert_eq!(keyboard.rows.len(), 2);
        assert_eq!(keyboard.labels().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_private_identity_uses_user_as_chat() {
        let message = InboundMessage::private(42, "hi");
        assert_eq!(message.identity, ConversationId::new(42, 42));
        assert!(!message.chat_kind.is_group());
    }

    #[test]
    fn test_supergroup_counts_as_group() {
        assert!(ChatKind::Supergroup.is_group());
        assert!(!ChatKind::Channel.is_group());
    }
}
