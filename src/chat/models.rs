//! The core models for managing a stateful chat with an LLM.
use std::str::FromStr;

use crate::openai::{Message, Role};

/// Ordered conversation history. Every request replays the whole
/// thing, so the public API only ever appends.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transcript(Vec<Message>);

impl Transcript {
    /// Starts a transcript seeded with the system message.
    pub fn new(system_message: &str) -> Self {
        Self(vec![Message::new(Role::System, system_message)])
    }

    pub fn messages(&self) -> &[Message] {
        &self.0
    }

    pub fn push(&mut self, msg: Message) {
        self.0.push(msg)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.0.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.0.iter()
    }

    /// Drops everything appended after `len`. Only used to undo a
    /// failed turn.
    pub(crate) fn rollback_to(&mut self, len: usize) {
        self.0.truncate(len)
    }
}

/// What happens to the user's message when a turn fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Leave the unanswered user message in the history so it is
    /// sent again as context on the next turn.
    #[default]
    KeepUserMessage,
    /// Restore the transcript to how it was before the turn.
    Rollback,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep" => Ok(FailurePolicy::KeepUserMessage),
            "rollback" => Ok(FailurePolicy::Rollback),
            other => Err(format!("Invalid failure policy: '{}'", other)),
        }
    }
}
