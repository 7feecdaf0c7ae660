//! Telegram Bot API client.
//!
//! Long polls `getUpdates` for inbound text messages and implements the
//! outbound [`Transport`] and [`PollService`] on top of `sendMessage`,
//! `sendPhoto` and `sendPoll`.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use pocket_core::{
    ChatKind, ConversationId, InboundMessage, Keyboard, Outbound, PollFailure, PollRequest,
    PollService, Transport, TransportError,
};
use regex::RegexSet;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Pause after a failed `getUpdates` before asking again.
const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub from: Option<Sender>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    pub id: i64,
}

#[derive(Debug, Serialize)]
struct KeyboardButton<'a> {
    text: &'a str,
}

impl Update {
    /// The assistant only reads text messages with a known sender.
    pub fn into_inbound(self) -> Option<InboundMessage> {
        let message = self.message?;
        let text = message.text?;
        let sender = message.from?;
        Some(InboundMessage {
            identity: ConversationId::new(sender.id, message.chat.id),
            chat_kind: chat_kind(&message.chat.kind),
            text,
        })
    }
}

fn chat_kind(kind: &str) -> ChatKind {
    match kind {
        "group" => ChatKind::Group,
        "supergroup" => ChatKind::Supergroup,
        "channel" => ChatKind::Channel,
        _ => ChatKind::Private,
    }
}

fn reply_markup(keyboard: &Keyboard) -> Value {
    let rows: Vec<Vec<KeyboardButton<'_>>> = keyboard
        .rows
        .iter()
        .map(|row| row.iter().map(|label| KeyboardButton { text: label }).collect())
        .collect();
    json!({ "keyboard": rows, "resize_keyboard": true })
}

/// `sendPoll` body. Anonymity is left to the platform default, which
/// channels require.
fn poll_payload(request: &PollRequest) -> Value {
    let options: Vec<Value> = request.options.iter().map(|text| json!({ "text": text })).collect();
    json!({
        "chat_id": request.chat,
        "question": request.question,
        "options": options,
    })
}

/// Offset that acknowledges every update in `updates`.
pub fn next_offset(current: i64, updates: &[Update]) -> i64 {
    updates
        .iter()
        .map(|update| update.update_id + 1)
        .fold(current, i64::max)
}

/// Map a `sendPoll` rejection to the failure kind shown to the user.
pub fn classify_poll_error(description: &str) -> PollFailure {
    static PATTERNS: OnceLock<Option<RegexSet>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        RegexSet::new([
            r"(?i)chat not found",
            r"(?i)poll must have at least \d+ option",
            r"(?i)poll can't have more than \d+ options",
            r"(?i)poll options must be non-empty",
        ])
        .ok()
    });

    let Some(patterns) = patterns else {
        return PollFailure::UpstreamError;
    };
    match patterns.matches(description).iter().next() {
        Some(0) => PollFailure::ChatNotFound,
        Some(1) => PollFailure::TooFewOptions,
        Some(2) => PollFailure::TooManyOptions,
        Some(3) => PollFailure::EmptyOptionText,
        _ => PollFailure::UpstreamError,
    }
}

/// Bot API client bound to one token.
#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(client: reqwest::Client, api_url: &str, token: &str) -> Self {
        Self {
            client,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, payload: &Value) -> Result<T, TransportError> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| TransportError::Request(format!("{}: {}", method, e.without_url())))?;

        let status = response.status();
        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| TransportError::Request(format!("{}: invalid response ({}): {}", method, status, e)))?;

        if !envelope.ok {
            return Err(TransportError::Rejected(
                envelope.description.unwrap_or_else(|| status.to_string()),
            ));
        }
        envelope
            .result
            .ok_or_else(|| TransportError::Request(format!("{}: response without result", method)))
    }

    pub async fn get_me(&self) -> Result<BotUser, TransportError> {
        self.call("getMe", &json!({})).await
    }

    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, TransportError> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message"],
            }),
        )
        .await
    }

    /// Offset past everything queued while the bot was offline.
    ///
    /// Asking for offset `-1` returns only the newest pending update, which is
    /// enough to confirm all of them.
    pub async fn skip_pending(&self) -> Result<i64, TransportError> {
        let latest = self
            .call::<Vec<Update>>(
                "getUpdates",
                &json!({ "offset": -1, "timeout": 0, "allowed_updates": ["message"] }),
            )
            .await?;
        Ok(next_offset(0, &latest))
    }

    /// Feed text messages into `inbound` until the receiver is dropped.
    ///
    /// `timeout_secs` is the long-poll timeout handed to Telegram; the HTTP
    /// client timeout must exceed it. With `skip_pending`, updates sent while
    /// the bot was offline are dropped unread.
    pub async fn poll_updates(
        &self,
        inbound: mpsc::Sender<InboundMessage>,
        timeout_secs: u64,
        skip_pending: bool,
    ) {
        let mut offset = 0;
        if skip_pending {
            match self.skip_pending().await {
                Ok(next) => {
                    info!(offset = next, "Skipped updates sent while offline");
                    offset = next;
                }
                Err(e) => warn!(error = %e, "Could not skip pending updates"),
            }
        }
        info!(timeout_secs, "Polling for updates");

        loop {
            let updates = match self.get_updates(offset, timeout_secs).await {
                Ok(updates) => updates,
                Err(e) => {
                    warn!(error = %e, "getUpdates failed, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
            };

            offset = next_offset(offset, &updates);
            for update in updates {
                let update_id = update.update_id;
                let Some(message) = update.into_inbound() else {
                    debug!(update_id, "Skipping non-text update");
                    continue;
                };
                if inbound.send(message).await.is_err() {
                    info!("Assistant stopped, no longer polling");
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl Transport for TelegramClient {
    async fn send(&self, chat: pocket_core::ChatId, message: &Outbound) -> Result<(), TransportError> {
        let (method, payload) = match message {
            Outbound::Text { text, keyboard } => {
                let mut payload = json!({ "chat_id": chat.0, "text": text });
                if let Some(keyboard) = keyboard {
                    payload["reply_markup"] = reply_markup(keyboard);
                }
                ("sendMessage", payload)
            }
            Outbound::Image { url } => ("sendPhoto", json!({ "chat_id": chat.0, "photo": url })),
        };
        self.call::<Value>(method, &payload).await.map(|_| ())
    }
}

#[async_trait]
impl PollService for TelegramClient {
    async fn send_poll(&self, request: &PollRequest) -> Result<(), PollFailure> {
        match self.call::<Value>("sendPoll", &poll_payload(request)).await {
            Ok(_) => {
                info!(chat = %request.chat, options = request.options.len(), "Poll sent");
                Ok(())
            }
            Err(TransportError::Rejected(description)) => {
                let failure = classify_poll_error(&description);
                warn!(chat = %request.chat, %description, %failure, "Poll rejected");
                Err(failure)
            }
            Err(e) => {
                warn!(chat = %request.chat, error = %e, "Poll request failed");
                Err(PollFailure::UpstreamError)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_poll_errors() {
        assert_eq!(
            classify_poll_error("Bad Request: chat not found"),
            PollFailure::ChatNotFound
        );
        assert_eq!(
            classify_poll_error("Bad Request: poll must have at least 2 option"),
            PollFailure::TooFewOptions
        );
        assert_eq!(
            classify_poll_error("Bad Request: poll can't have more than 10 options"),
            PollFailure::TooManyOptions
        );
        assert_eq!(
            classify_poll_error("Bad Request: poll options must be non-empty"),
            PollFailure::EmptyOptionText
        );
        assert_eq!(
            classify_poll_error("Bad Request: poll options length must not exceed 100"),
            PollFailure::UpstreamError
        );
        assert_eq!(
            classify_poll_error("Forbidden: bot was kicked from the group chat"),
            PollFailure::UpstreamError
        );
    }

    #[test]
    fn test_update_into_inbound() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 10,
            "message": {
                "message_id": 1,
                "from": {"id": 7, "is_bot": false, "first_name": "A"},
                "chat": {"id": -100, "type": "supergroup", "title": "Team"},
                "text": "/survey@pocket_bot"
            }
        }))
        .unwrap();

        let message = update.into_inbound().unwrap();

        assert_eq!(message.identity, ConversationId::new(7, -100));
        assert_eq!(message.chat_kind, ChatKind::Supergroup);
        assert_eq!(message.text, "/survey@pocket_bot");
    }

    #[test]
    fn test_non_text_updates_are_skipped() {
        let sticker: Update = serde_json::from_value(json!({
            "update_id": 11,
            "message": {
                "from": {"id": 7},
                "chat": {"id": 7, "type": "private"},
                "sticker": {"file_id": "x"}
            }
        }))
        .unwrap();
        let edited: Update = serde_json::from_value(json!({"update_id": 12})).unwrap();

        assert!(sticker.into_inbound().is_none());
        assert!(edited.into_inbound().is_none());
    }

    #[test]
    fn test_reply_markup_layout() {
        let markup = reply_markup(&Keyboard::from_labels(["A", "B", "C"]));

        assert_eq!(markup["keyboard"][0][1]["text"], "B");
        assert_eq!(markup["keyboard"][1][0]["text"], "C");
        assert_eq!(markup["resize_keyboard"], true);
    }

    #[test]
    fn test_next_offset() {
        let updates: Vec<Update> = serde_json::from_value(json!([
            {"update_id": 41},
            {"update_id": 43},
            {"update_id": 42}
        ]))
        .unwrap();

        assert_eq!(next_offset(0, &updates), 44);
        // Nothing pending keeps the offset.
        assert_eq!(next_offset(0, &[]), 0);
        assert_eq!(next_offset(50, &updates), 50);
    }

    #[test]
    fn test_poll_payload_leaves_anonymity_to_platform() {
        let payload = poll_payload(&PollRequest {
            chat: "@team".into(),
            question: "Lunch?".into(),
            options: vec!["Soup".into(), "Salad".into()],
        });

        assert_eq!(payload["chat_id"], "@team");
        assert_eq!(payload["options"][1]["text"], "Salad");
        assert!(payload.get("is_anonymous").is_none());
    }

    #[test]
    fn test_base_url_strips_trailing_slash() {
        let client = TelegramClient::new(reqwest::Client::new(), "http://localhost:8081/", "123:abc");
        assert_eq!(client.base_url, "http://localhost:8081/bot123:abc");
    }
}
