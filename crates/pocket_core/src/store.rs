//! Per-conversation session store.
//!
//! The store keeps, for every [`ConversationId`], the dialogue currently in
//! progress and the scratchpad of values collected so far. It is accessed only
//! through [`SessionStore::get`], [`SessionStore::set`], [`SessionStore::update`]
//! and [`SessionStore::clear`]; the actual storage is an injected
//! [`SessionBackend`].
//!
//! The shipped [`MemoryBackend`] keeps everything in process memory. Sessions
//! do not survive a restart: a user who was halfway through a dialogue simply
//! finds the assistant idle again.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::dialogue::DialogueKind;
use crate::error::{SessionError, SessionResult};
use crate::types::ConversationId;

/// Values collected during a dialogue, keyed by field name.
pub type Scratchpad = HashMap<String, Value>;

/// Which dialogue step, if any, a conversation is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DialogueState {
    #[default]
    Idle,
    Active { dialogue: DialogueKind, step: usize },
}

impl DialogueState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Dialogue state plus scratchpad for one conversation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Session {
    pub state: DialogueState,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub scratchpad: Scratchpad,
}

impl Session {
    /// The idle session: no dialogue, nothing collected.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Session positioned at `step` of `dialogue` with the given scratchpad.
    pub fn active(dialogue: DialogueKind, step: usize, scratchpad: Scratchpad) -> Self {
        Self {
            state: DialogueState::Active { dialogue, step },
            scratchpad,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    /// Idle sessions never carry scratchpad values.
    pub fn is_consistent(&self) -> bool {
        !self.is_idle() || self.scratchpad.is_empty()
    }

    /// String value of a scratchpad field.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.scratchpad.get(field).and_then(Value::as_str)
    }
}

/// Storage behind a [`SessionStore`].
///
/// Backends only ever hold active sessions; an absent entry means idle.
/// Implementations must let different conversations be mutated concurrently
/// without a global lock.
pub trait SessionBackend: Send + Sync {
    /// Load the stored session for a conversation.
    fn load(&self, id: &ConversationId) -> Option<Session>;

    /// Store (or replace) an active session.
    fn save(&self, id: ConversationId, session: Session);

    /// Forget a conversation.
    fn remove(&self, id: &ConversationId);

    /// Write one scratchpad field of a stored session.
    ///
    /// Returns `false` when nothing is stored for `id`.
    fn merge(&self, id: &ConversationId, field: &str, value: Value) -> bool;

    /// Number of stored sessions.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory backend on a sharded concurrent map.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    sessions: DashMap<ConversationId, Session>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionBackend for MemoryBackend {
    fn load(&self, id: &ConversationId) -> Option<Session> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    fn save(&self, id: ConversationId, session: Session) {
        self.sessions.insert(id, session);
    }

    fn remove(&self, id: &ConversationId) {
        self.sessions.remove(id);
    }

    fn merge(&self, id: &ConversationId, field: &str, value: Value) -> bool {
        match self.sessions.get_mut(id) {
            Some(mut entry) => {
                entry.scratchpad.insert(field.to_string(), value);
                true
            }
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}

/// Handle to the session store. Cheap to clone.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl SessionStore {
    /// Create a store over an injected backend.
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self { backend }
    }

    /// Create a store backed by process memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Current session of a conversation; idle if none is stored.
    pub fn get(&self, id: &ConversationId) -> Session {
        self.backend.load(id).unwrap_or_default()
    }

    /// Replace the session of a conversation.
    ///
    /// Setting [`DialogueState::Idle`] discards the scratchpad.
    pub fn set(&self, id: ConversationId, state: DialogueState, scratchpad: Scratchpad) {
        match state {
            DialogueState::Idle => self.clear(&id),
            DialogueState::Active { .. } => {
                debug!(conversation = %id, ?state, "Storing session");
                self.backend.save(id, Session { state, scratchpad });
            }
        }
    }

    /// Store a whole session value.
    pub fn put(&self, id: ConversationId, session: Session) {
        self.set(id, session.state, session.scratchpad);
    }

    /// Write one field into the scratchpad of an active dialogue.
    pub fn update(&self, id: &ConversationId, field: &str, value: Value) -> SessionResult<()> {
        if self.backend.merge(id, field, value) {
            Ok(())
        } else {
            Err(SessionError::UnknownSession(*id))
        }
    }

    /// Reset a conversation to idle.
    pub fn clear(&self, id: &ConversationId) {
        debug!(conversation = %id, "Clearing session");
        self.backend.remove(id);
    }

    /// Number of conversations with a dialogue in progress.
    pub fn active_count(&self) -> usize {
        self.backend.len()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("active", &self.backend.len())
            .finish()
    }
}
