//! Command router.
//!
//! [`Router::route`] is a pure function of the current session and the inbound
//! message. It returns the session to store, the replies to send right away and
//! at most one [`Effect`] to perform. [`Router::render`] turns the outcome of
//! that effect into replies. Nothing in here touches the store, the network or
//! the transport.
//!
//! Precedence:
//! 1. A conversation with an active dialogue sends every message to the
//!    current step, except the cancellation token, which ends the dialogue.
//! 2. Otherwise a slash command is looked up by token,
//! 3. then the text is matched against the menu button labels,
//! 4. and anything else is ignored.

use tracing::{debug, info, warn};

use crate::commands::{parse_command, CommandAction, CommandDefinition, CommandTable};
use crate::dialogue::{DialogueRegistry, MissingField, StepOutcome};
use crate::services::{Effect, EffectOutcome, ExchangeFailure, PollFailure, WeatherFailure};
use crate::store::{DialogueState, Session};
use crate::texts;
use crate::types::{InboundMessage, Outbound};

/// Text that abandons any dialogue in progress (compared case-insensitively).
pub const CANCEL_TOKEN: &str = "menu";

/// Result of routing one message.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Session to store for the conversation.
    pub session: Session,
    /// Replies to send before the effect runs.
    pub replies: Vec<Outbound>,
    /// Side-effect to perform; its outcome is rendered by [`Router::render`].
    pub effect: Option<Effect>,
}

impl Transition {
    fn stay(session: &Session, replies: Vec<Outbound>) -> Self {
        Self {
            session: session.clone(),
            replies,
            effect: None,
        }
    }

    fn idle(replies: Vec<Outbound>) -> Self {
        Self {
            session: Session::idle(),
            replies,
            effect: None,
        }
    }

    fn finish(effect: Effect) -> Self {
        Self {
            session: Session::idle(),
            replies: Vec::new(),
            effect: Some(effect),
        }
    }

    /// No reply, no effect, nothing stored.
    pub fn is_silent(&self) -> bool {
        self.replies.is_empty() && self.effect.is_none()
    }
}

/// Routes messages through the command table and the dialogue registry.
#[derive(Debug, Clone)]
pub struct Router {
    commands: CommandTable,
    dialogues: DialogueRegistry,
    bot_username: Option<String>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(CommandTable::with_defaults(), DialogueRegistry::with_defaults())
    }
}

impl Router {
    pub fn new(commands: CommandTable, dialogues: DialogueRegistry) -> Self {
        Self {
            commands,
            dialogues,
            bot_username: None,
        }
    }

    /// Ignore `/command@other_bot` in group chats.
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn dialogues(&self) -> &DialogueRegistry {
        &self.dialogues
    }

    /// Decide what to do with `message` given the conversation's `session`.
    pub fn route(&self, session: &Session, message: &InboundMessage) -> Transition {
        match session.state {
            DialogueState::Idle => self.route_idle(message),
            DialogueState::Active { dialogue, step } => {
                if is_cancel_token(&message.text) {
                    info!(conversation = %message.identity, dialogue = dialogue.as_str(), "Dialogue cancelled");
                    return Transition::idle(vec![self.menu_reply(texts::MENU_RETURN)]);
                }

                let Some(definition) = self.dialogues.get(dialogue) else {
                    warn!(conversation = %message.identity, dialogue = dialogue.as_str(), "No definition for stored dialogue, treating as idle");
                    return self.route_idle(message);
                };

                match definition.accept(step, session.scratchpad.clone(), &message.text, message) {
                    Ok(outcome) => self.apply(session, outcome),
                    Err(missing) => self.recover(message, missing),
                }
            }
        }
    }

    fn route_idle(&self, message: &InboundMessage) -> Transition {
        if let Some(parsed) = parse_command(&message.text) {
            if let (Some(mention), Some(own)) = (parsed.mention, &self.bot_username) {
                if !mention.eq_ignore_ascii_case(own) {
                    debug!(conversation = %message.identity, mention, "Command addressed to another bot");
                    return Transition::idle(Vec::new());
                }
            }
            if let Some(command) = self.commands.by_token(parsed.token) {
                return self.invoke(command, message, parsed.args);
            }
            debug!(conversation = %message.identity, token = parsed.token, "Unknown command");
            return Transition::idle(Vec::new());
        }

        if let Some(command) = self.commands.by_label(&message.text) {
            return self.invoke(command, message, "");
        }

        debug!(conversation = %message.identity, "No command matched, ignoring");
        Transition::idle(Vec::new())
    }

    fn invoke(&self, command: &CommandDefinition, message: &InboundMessage, args: &str) -> Transition {
        debug!(conversation = %message.identity, command = command.token, "Command matched");
        match command.action {
            CommandAction::Greet => Transition::idle(vec![self.menu_reply(texts::GREETING)]),
            CommandAction::Help => Transition::idle(vec![Outbound::text(self.commands.help_text())]),
            CommandAction::RandomImage { query } => Transition::finish(Effect::RandomImage {
                query: query.to_string(),
            }),
            CommandAction::Start(kind) => {
                let Some(definition) = self.dialogues.get(kind) else {
                    warn!(dialogue = kind.as_str(), "Command bound to an unregistered dialogue");
                    return Transition::idle(Vec::new());
                };
                info!(conversation = %message.identity, dialogue = kind.as_str(), "Dialogue started");
                match definition.enter(message, args) {
                    Ok(outcome) => self.apply(&Session::idle(), outcome),
                    Err(missing) => {
                        warn!(dialogue = kind.as_str(), %missing, "Dialogue could not start");
                        Transition::idle(Vec::new())
                    }
                }
            }
        }
    }

    fn apply(&self, current: &Session, outcome: StepOutcome) -> Transition {
        match outcome {
            StepOutcome::Reprompt(reprompt) => Transition::stay(current, vec![Outbound::text(reprompt.0)]),
            StepOutcome::Await { session, prompt } => Transition {
                session,
                replies: vec![Outbound::text(prompt)],
                effect: None,
            },
            StepOutcome::Complete(effect) => {
                info!(capability = effect.capability(), "Dialogue complete");
                Transition::finish(effect)
            }
        }
    }

    /// A stored session that no longer fits the dialogue table is dropped and
    /// the message is handled as if the conversation were idle.
    fn recover(&self, message: &InboundMessage, missing: MissingField) -> Transition {
        warn!(conversation = %message.identity, %missing, "Inconsistent session, treating as idle");
        self.route_idle(message)
    }

    fn menu_reply(&self, text: &str) -> Outbound {
        Outbound::with_keyboard(text, self.commands.keyboard())
    }

    /// Replies for the outcome of an effect.
    pub fn render(&self, effect: &Effect, outcome: &EffectOutcome) -> Vec<Outbound> {
        let reply = match (effect, outcome) {
            (Effect::Weather { city }, EffectOutcome::Weather(result)) => match result {
                Ok(report) => texts::weather_report(city, report),
                Err(WeatherFailure::LocationNotFound) => texts::weather_not_found(city),
                Err(WeatherFailure::UpstreamError) => texts::WEATHER_UPSTREAM.to_string(),
            },
            (Effect::Convert { amount, from, to }, EffectOutcome::Convert(result)) => match result {
                Ok(quote) => {
                    let converted = texts::round_cents(amount * quote.rate);
                    texts::conversion(*amount, from, converted, to)
                }
                Err(ExchangeFailure::CurrencyNotFound) => texts::currency_not_found(to),
                Err(ExchangeFailure::UpstreamError) => texts::CURRENCY_UPSTREAM.to_string(),
            },
            (Effect::RandomImage { .. }, EffectOutcome::RandomImage(result)) => match result {
                Ok(image) => return vec![Outbound::image(image.url.clone())],
                Err(_) => texts::IMAGE_UPSTREAM.to_string(),
            },
            (Effect::Poll(_), EffectOutcome::Poll(result)) => {
                let text = match result {
                    Ok(()) => texts::POLL_CREATED,
                    Err(PollFailure::ChatNotFound) => texts::POLL_CHAT_NOT_FOUND,
                    Err(PollFailure::TooFewOptions) => texts::POLL_TOO_FEW_OPTIONS,
                    Err(PollFailure::TooManyOptions) => texts::POLL_TOO_MANY_OPTIONS,
                    Err(PollFailure::EmptyOptionText) => texts::POLL_EMPTY_OPTION,
                    Err(PollFailure::UpstreamError) => texts::POLL_UPSTREAM,
                };
                text.to_string()
            }
            (effect, outcome) => {
                warn!(?effect, ?outcome, "Outcome does not belong to effect");
                return Vec::new();
            }
        };
        vec![Outbound::text(reply)]
    }
}

/// Whether `text` is the cancellation token.
pub fn is_cancel_token(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case(CANCEL_TOKEN)
}
