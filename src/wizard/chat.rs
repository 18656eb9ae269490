//! Conversation log for the campaign wizard
//!
//! Messages are append-only; the only mutation ever applied to an existing
//! entry is clearing its searching flag once the stream finishes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::protocol::SearchPhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Placeholder for a search still in flight
    pub is_searching: bool,
    /// Prompts the user to pick a product
    pub is_product_selection: bool,
    /// Marks the boundary between wizard steps
    pub is_stage_transition: bool,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            role,
            content: content.into(),
            is_searching: false,
            is_product_selection: false,
            is_stage_transition: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn searching(mut self) -> Self {
        self.is_searching = true;
        self
    }

    pub fn product_selection(mut self) -> Self {
        self.is_product_selection = true;
        self
    }

    pub fn stage_transition(mut self) -> Self {
        self.is_stage_transition = true;
        self
    }
}

/// Append-only message log
#[derive(Debug, Default)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, returning its id
    pub fn push(&mut self, message: ChatMessage) -> String {
        let id = message.id.clone();
        self.messages.push(message);
        id
    }

    /// Clear the searching flag on the message with `id`, if present
    pub fn finish_searching(&mut self, id: &str) {
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == id) {
            message.is_searching = false;
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Human-readable summary of the phases a finished search went through
///
/// Plumbing phases (idle, connecting) and terminal phases are omitted;
/// the trail is already distinct and ordered.
pub fn thinking_steps(trail: &[SearchPhase]) -> Vec<String> {
    trail
        .iter()
        .filter_map(|phase| {
            let step = match phase {
                SearchPhase::Interpreting => "Interpreted the query",
                SearchPhase::Searching => "Searched companies",
                SearchPhase::Ranking => "Ranked matches",
                SearchPhase::Results => "Collected results",
                SearchPhase::Suggesting | SearchPhase::PartnerSuggestion => "Suggested partners",
                SearchPhase::SuggestionsComplete => "Finalized partner suggestions",
                SearchPhase::Insights => "Generated insights",
                SearchPhase::Idle
                | SearchPhase::Connecting
                | SearchPhase::Complete
                | SearchPhase::Error => return None,
            };
            Some(step.to_string())
        })
        .collect()
}
