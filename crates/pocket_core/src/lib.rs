//! # pocket_core - Dialogue engine for the Pocket assistant
//!
//! The assistant answers chat messages with four services: weather lookup,
//! currency conversion, random pictures and group polls. This crate holds the
//! part with state: which multi-step dialogue each conversation is in, what it
//! has collected so far, and where the next message goes.
//!
//! ## Architecture
//!
//! ```text
//!  InboundMessage ──▶ Assistant ──▶ Router::route (pure) ──▶ Transition
//!                        │   ▲                                   │
//!                        │   └────── SessionStore (per identity) ◀┘
//!                        ▼
//!                  Services::perform (weather / exchange / image / poll)
//!                        │
//!                        ▼
//!               Router::render ──▶ Transport::send
//! ```
//!
//! - **Session Store**: per-conversation dialogue state and scratchpad over an
//!   injected backend. In-memory only; a restart forgets every dialogue.
//! - **Dialogues**: table-driven step definitions with validators, prompts and
//!   a terminal effect.
//! - **Router**: pure function from (session, message) to (session, replies,
//!   effect).
//! - **Services**: adapter traits returning tagged outcomes.

pub mod assistant;
pub mod commands;
pub mod dialogue;
pub mod error;
pub mod mock;
pub mod router;
pub mod services;
pub mod store;
pub mod texts;
pub mod transport;
pub mod types;

pub use assistant::Assistant;
pub use commands::{parse_command, CommandAction, CommandDefinition, CommandTable, ParsedCommand};
pub use dialogue::{
    DialogueDefinition, DialogueKind, DialogueRegistry, MissingField, Reprompt, StepDefinition,
    StepOutcome, Successor,
};
pub use error::{SessionError, SessionResult, TransportError};
pub use mock::{CapturedCall, MockServices, RecordingTransport};
pub use router::{is_cancel_token, Router, Transition, CANCEL_TOKEN};
pub use services::{
    Effect, EffectOutcome, ExchangeFailure, ExchangeQuote, ExchangeService, ImageFailure,
    ImageRef, ImageService, PollFailure, PollRequest, PollService, Services, WeatherFailure,
    WeatherReport, WeatherService,
};
pub use store::{DialogueState, MemoryBackend, Scratchpad, Session, SessionBackend, SessionStore};
pub use transport::Transport;
pub use types::{ChatId, ChatKind, ConversationId, InboundMessage, Keyboard, Outbound, UserId};
