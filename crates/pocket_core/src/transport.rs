//! Outbound side of the messaging transport.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::types::{ChatId, Outbound};

/// Delivers replies to a chat.
///
/// Retries and backoff are the implementation's business; the assistant logs
/// a failed delivery and moves on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, chat: ChatId, message: &Outbound) -> Result<(), TransportError>;
}
