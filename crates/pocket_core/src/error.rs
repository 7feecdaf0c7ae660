//! Error types for the core crate.

use thiserror::Error;

use crate::types::ConversationId;

/// Result type alias for session store operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors raised by the session store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No active dialogue for conversation {0}")]
    UnknownSession(ConversationId),
}

/// Errors raised while delivering outbound messages.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Transport request failed: {0}")]
    Request(String),

    #[error("Transport rejected message: {0}")]
    Rejected(String),

    #[error("Transport closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
