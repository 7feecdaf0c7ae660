//! Dialogue definitions and the step machine that drives them.
//!
//! A dialogue is an ordered table of steps. Each step declares the prompt it
//! sends on entry, the scratchpad field it fills, a validator for the user's
//! reply and, optionally, an auto-fill rule that lets the step be skipped when
//! the triggering message already carries the value. The step after the last
//! one is terminal: the scratchpad is turned into an [`Effect`] and the
//! conversation goes back to idle.
//!
//! New dialogues are added by registering another [`DialogueDefinition`] in
//! the [`DialogueRegistry`]; the router never needs to change.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::services::{Effect, PollRequest};
use crate::store::{DialogueState, Scratchpad, Session};
use crate::texts;
use crate::types::InboundMessage;

/// Identifies a dialogue definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueKind {
    Weather,
    Currency,
    Poll,
}

impl DialogueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weather => "weather",
            Self::Currency => "currency",
            Self::Poll => "poll",
        }
    }
}

/// Corrective message sent when a reply fails validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reprompt(pub String);

impl Reprompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

/// Scratchpad fields produced by a successful validation.
pub type Fields = Vec<(&'static str, Value)>;

/// Checks a reply and extracts the fields it carries.
pub type Validator = fn(&str) -> Result<Fields, Reprompt>;

/// Produces a step's value from the triggering message, skipping the step.
pub type AutoFill = fn(&InboundMessage) -> Option<Value>;

/// Builds the terminal effect from a completed scratchpad.
pub type Finalizer = fn(&Scratchpad) -> Result<Effect, MissingField>;

/// A scratchpad field needed by a finalizer was absent or of the wrong type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Scratchpad field missing or malformed: {0}")]
pub struct MissingField(pub &'static str);

/// One step of a dialogue.
#[derive(Debug, Clone)]
pub struct StepDefinition {
    /// Field written by the auto-fill rule; also used in logs.
    pub field: &'static str,
    pub prompt: &'static str,
    pub validate: Validator,
    pub auto_fill: Option<AutoFill>,
}

impl StepDefinition {
    pub fn new(field: &'static str, prompt: &'static str, validate: Validator) -> Self {
        Self {
            field,
            prompt,
            validate,
            auto_fill: None,
        }
    }

    pub fn auto_fill(mut self, rule: AutoFill) -> Self {
        self.auto_fill = Some(rule);
        self
    }
}

/// Where a dialogue goes after a step accepts its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Successor {
    Step(usize),
    Terminal,
}

/// Outcome of feeding input to a dialogue.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Input rejected; the session is left untouched.
    Reprompt(Reprompt),
    /// Waiting on the next step; `prompt` should be sent.
    Await { session: Session, prompt: String },
    /// All steps done; perform the effect and go idle.
    Complete(Effect),
}

/// A named multi-step flow.
#[derive(Debug, Clone)]
pub struct DialogueDefinition {
    pub kind: DialogueKind,
    pub steps: Vec<StepDefinition>,
    pub finalize: Finalizer,
}

impl DialogueDefinition {
    pub fn new(kind: DialogueKind, finalize: Finalizer) -> Self {
        Self {
            kind,
            steps: Vec::new(),
            finalize,
        }
    }

    pub fn step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    pub fn get_step(&self, index: usize) -> Option<&StepDefinition> {
        self.steps.get(index)
    }

    pub fn successor(&self, index: usize) -> Successor {
        if index + 1 < self.steps.len() {
            Successor::Step(index + 1)
        } else {
            Successor::Terminal
        }
    }

    /// Start the dialogue for `message`.
    ///
    /// Non-empty `args` (inline command arguments) are fed to the first step
    /// that is not auto-filled, as if the user had sent them as a reply. If
    /// they fail validation the dialogue still starts, answering with the
    /// corrective message.
    pub fn enter(&self, message: &InboundMessage, args: &str) -> Result<StepOutcome, MissingField> {
        let entry = self.settle(0, Scratchpad::new(), message)?;
        let args = args.trim();
        match entry {
            StepOutcome::Await { session, prompt } if !args.is_empty() => {
                let DialogueState::Active { step, .. } = session.state else {
                    return Ok(StepOutcome::Await { session, prompt });
                };
                match self.accept(step, session.scratchpad.clone(), args, message)? {
                    StepOutcome::Reprompt(reprompt) => Ok(StepOutcome::Await {
                        session,
                        prompt: reprompt.0,
                    }),
                    outcome => Ok(outcome),
                }
            }
            outcome => Ok(outcome),
        }
    }

    /// Feed a reply to the step at `index`.
    pub fn accept(
        &self,
        index: usize,
        mut scratchpad: Scratchpad,
        input: &str,
        message: &InboundMessage,
    ) -> Result<StepOutcome, MissingField> {
        let Some(step) = self.get_step(index) else {
            return Err(MissingField("step"));
        };

        let fields = match (step.validate)(input) {
            Ok(fields) => fields,
            Err(reprompt) => {
                debug!(dialogue = self.kind.as_str(), step = step.field, "Input rejected");
                return Ok(StepOutcome::Reprompt(reprompt));
            }
        };
        for (name, value) in fields {
            scratchpad.insert(name.to_string(), value);
        }

        match self.successor(index) {
            Successor::Step(next) => self.settle(next, scratchpad, message),
            Successor::Terminal => Ok(StepOutcome::Complete((self.finalize)(&scratchpad)?)),
        }
    }

    /// Position the dialogue at the first step from `index` that needs input,
    /// auto-filling the ones that don't.
    fn settle(
        &self,
        mut index: usize,
        mut scratchpad: Scratchpad,
        message: &InboundMessage,
    ) -> Result<StepOutcome, MissingField> {
        while let Some(step) = self.get_step(index) {
            match step.auto_fill.and_then(|rule| rule(message)) {
                Some(value) => {
                    debug!(dialogue = self.kind.as_str(), step = step.field, "Step auto-filled");
                    scratchpad.insert(step.field.to_string(), value);
                    index += 1;
                }
                None => {
                    return Ok(StepOutcome::Await {
                        session: Session::active(self.kind, index, scratchpad),
                        prompt: step.prompt.to_string(),
                    })
                }
            }
        }
        Ok(StepOutcome::Complete((self.finalize)(&scratchpad)?))
    }
}

/// Lookup table of dialogue definitions.
#[derive(Debug, Clone, Default)]
pub struct DialogueRegistry {
    dialogues: HashMap<DialogueKind, DialogueDefinition>,
}

impl DialogueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the weather, currency and poll dialogues.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(weather_dialogue());
        registry.register(currency_dialogue());
        registry.register(poll_dialogue());
        registry
    }

    /// Register a definition, replacing any previous one of the same kind.
    pub fn register(&mut self, definition: DialogueDefinition) {
        debug!(dialogue = definition.kind.as_str(), "Registering dialogue");
        self.dialogues.insert(definition.kind, definition);
    }

    pub fn get(&self, kind: DialogueKind) -> Option<&DialogueDefinition> {
        self.dialogues.get(&kind)
    }

    pub fn len(&self) -> usize {
        self.dialogues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dialogues.is_empty()
    }
}

// Weather

pub fn weather_dialogue() -> DialogueDefinition {
    DialogueDefinition::new(DialogueKind::Weather, finalize_weather).step(StepDefinition::new(
        "city",
        texts::WEATHER_PROMPT,
        validate_city,
    ))
}

fn validate_city(input: &str) -> Result<Fields, Reprompt> {
    let city = input.trim();
    if city.is_empty() {
        return Err(Reprompt::new(texts::WEATHER_PROMPT));
    }
    Ok(vec![("city", json!(city))])
}

fn finalize_weather(scratchpad: &Scratchpad) -> Result<Effect, MissingField> {
    Ok(Effect::Weather {
        city: text_field(scratchpad, "city")?,
    })
}

// Currency

pub fn currency_dialogue() -> DialogueDefinition {
    DialogueDefinition::new(DialogueKind::Currency, finalize_currency).step(StepDefinition::new(
        "query",
        texts::CURRENCY_PROMPT,
        validate_currency_query,
    ))
}

/// Accepts `<amount> <from> <to>` with a positive numeric amount.
pub fn validate_currency_query(input: &str) -> Result<Fields, Reprompt> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    let [amount, from, to] = tokens.as_slice() else {
        return Err(Reprompt::new(texts::CURRENCY_FORMAT_REMINDER));
    };
    let amount = match amount.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value,
        _ => return Err(Reprompt::new(texts::CURRENCY_NOT_NUMERIC)),
    };
    Ok(vec![
        ("amount", json!(amount)),
        ("from", json!(from)),
        ("to", json!(to)),
    ])
}

fn finalize_currency(scratchpad: &Scratchpad) -> Result<Effect, MissingField> {
    let amount = scratchpad
        .get("amount")
        .and_then(Value::as_f64)
        .ok_or(MissingField("amount"))?;
    Ok(Effect::Convert {
        amount,
        from: text_field(scratchpad, "from")?,
        to: text_field(scratchpad, "to")?,
    })
}

// Poll

pub fn poll_dialogue() -> DialogueDefinition {
    DialogueDefinition::new(DialogueKind::Poll, finalize_poll)
        .step(
            StepDefinition::new("chat_target", texts::POLL_CHAT_PROMPT, validate_chat_target)
                .auto_fill(current_group_chat),
        )
        .step(StepDefinition::new(
            "title",
            texts::POLL_TITLE_PROMPT,
            validate_title,
        ))
        .step(StepDefinition::new(
            "options",
            texts::POLL_OPTIONS_PROMPT,
            split_options,
        ))
}

/// Polls started inside a group go to that group.
fn current_group_chat(message: &InboundMessage) -> Option<Value> {
    message
        .chat_kind
        .is_group()
        .then(|| json!(message.chat().to_string()))
}

fn validate_chat_target(input: &str) -> Result<Fields, Reprompt> {
    let target = input.trim();
    if target.is_empty() {
        return Err(Reprompt::new(texts::POLL_BLANK_INPUT));
    }
    Ok(vec![("chat_target", json!(target))])
}

fn validate_title(input: &str) -> Result<Fields, Reprompt> {
    if input.trim().is_empty() {
        return Err(Reprompt::new(texts::POLL_BLANK_INPUT));
    }
    Ok(vec![("title", json!(input))])
}

/// Options are split on `;` and kept verbatim; count limits belong to the
/// platform.
pub fn split_options(input: &str) -> Result<Fields, Reprompt> {
    let options: Vec<&str> = input.split(';').collect();
    Ok(vec![("options", json!(options))])
}

fn finalize_poll(scratchpad: &Scratchpad) -> Result<Effect, MissingField> {
    let options = scratchpad
        .get("options")
        .and_then(Value::as_array)
        .ok_or(MissingField("options"))?
        .iter()
        .map(|option| option.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or(MissingField("options"))?;
    Ok(Effect::Poll(PollRequest {
        chat: text_field(scratchpad, "chat_target")?,
        question: text_field(scratchpad, "title")?,
        options,
    }))
}

fn text_field(scratchpad: &Scratchpad, field: &'static str) -> Result<String, MissingField> {
    scratchpad
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(MissingField(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_validation() {
        let fields = validate_currency_query("100 usd eur").unwrap();
        assert_eq!(fields[0], ("amount", json!(100.0)));
        assert_eq!(fields[1], ("from", json!("usd")));
        assert_eq!(fields[2], ("to", json!("eur")));
    }

    #[test]
    fn test_currency_token_count() {
        for input in ["", "100", "100 USD", "100 USD to EUR"] {
            assert_eq!(
                validate_currency_query(input).unwrap_err(),
                Reprompt::new(texts::CURRENCY_FORMAT_REMINDER),
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn test_currency_amount_must_be_positive_number() {
        for input in ["abc USD EUR", "-5 USD EUR", "0 USD EUR", "inf USD EUR", "NaN USD EUR"] {
            assert_eq!(
                validate_currency_query(input).unwrap_err(),
                Reprompt::new(texts::CURRENCY_NOT_NUMERIC),
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn test_split_options_verbatim() {
        let fields = split_options("Red; Green;;Blue ").unwrap();
        assert_eq!(fields[0].1, json!(["Red", " Green", "", "Blue "]));
    }

    #[test]
    fn test_poll_private_chat_starts_at_chat_target() {
        let dialogue = poll_dialogue();
        let message = InboundMessage::private(1, "/survey");

        match dialogue.enter(&message, "").unwrap() {
            StepOutcome::Await { session, prompt } => {
                assert_eq!(
                    session.state,
                    DialogueState::Active {
                        dialogue: DialogueKind::Poll,
                        step: 0
                    }
                );
                assert_eq!(prompt, texts::POLL_CHAT_PROMPT);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_poll_group_chat_skips_chat_target() {
        let dialogue = poll_dialogue();
        let message = InboundMessage::group(1, -100, "/survey");

        match dialogue.enter(&message, "").unwrap() {
            StepOutcome::Await { session, prompt } => {
                assert_eq!(
                    session.state,
                    DialogueState::Active {
                        dialogue: DialogueKind::Poll,
                        step: 1
                    }
                );
                assert_eq!(session.text("chat_target"), Some("-100"));
                assert_eq!(prompt, texts::POLL_TITLE_PROMPT);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_accept_last_step_completes() {
        let dialogue = poll_dialogue();
        let message = InboundMessage::private(1, "a;b");
        let mut scratchpad = Scratchpad::new();
        scratchpad.insert("chat_target".into(), json!("42"));
        scratchpad.insert("title".into(), json!("Lunch?"));

        let outcome = dialogue.accept(2, scratchpad, "a;b", &message).unwrap();

        assert_eq!(
            outcome,
            StepOutcome::Complete(Effect::Poll(PollRequest {
                chat: "42".into(),
                question: "Lunch?".into(),
                options: vec!["a".into(), "b".into()],
            }))
        );
    }

    #[test]
    fn test_enter_with_inline_arguments() {
        let dialogue = weather_dialogue();
        let message = InboundMessage::private(1, "/weather Paris");

        assert_eq!(
            dialogue.enter(&message, " Paris ").unwrap(),
            StepOutcome::Complete(Effect::Weather {
                city: "Paris".into()
            })
        );
    }

    #[test]
    fn test_enter_with_bad_inline_arguments_reprompts() {
        let dialogue = currency_dialogue();
        let message = InboundMessage::private(1, "/currency_converter 100");

        match dialogue.enter(&message, "100").unwrap() {
            StepOutcome::Await { session, prompt } => {
                assert_eq!(prompt, texts::CURRENCY_FORMAT_REMINDER);
                assert!(session.scratchpad.is_empty());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_finalizer_reports_missing_field() {
        let dialogue = currency_dialogue();
        let message = InboundMessage::private(1, "x");
        assert_eq!(
            (dialogue.finalize)(&Scratchpad::new()).unwrap_err(),
            MissingField("amount")
        );
        assert!(dialogue.accept(5, Scratchpad::new(), "x", &message).is_err());
    }

    #[test]
    fn test_registry_defaults() {
        let registry = DialogueRegistry::with_defaults();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get(DialogueKind::Poll).unwrap().steps.len(), 3);
        assert!(matches!(
            registry.get(DialogueKind::Weather).unwrap().successor(0),
            Successor::Terminal
        ));
    }
}
