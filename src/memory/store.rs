//! Conversation history storage
//!
//! Append-only record of the turns in one chat session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    fn label(self) -> &'static str {
        match self {
            TurnRole::User => "User",
            TurnRole::Assistant => "Assistant",
        }
    }
}

/// A single turn in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Conversation history for a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ConversationTurn::new(TurnRole::User, content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns
            .push(ConversationTurn::new(TurnRole::Assistant, content));
    }

    /// Iterate over all turns, oldest first
    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Render history as plain `Role: text` lines for rewrite prompts
    pub fn format_for_prompt(&self) -> String {
        if self.turns.is_empty() {
            return "Beginning of the conversation".to_string();
        }

        self.turns
            .iter()
            .map(|t| format!("{}: {}", t.role.label(), t.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history_placeholder() {
        let history = ConversationHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.format_for_prompt(), "Beginning of the conversation");
    }

    #[test]
    fn test_history_formatting_preserves_order() {
        let mut history = ConversationHistory::new();
        history.push_user("What was Apple's revenue in 2024?");
        history.push_assistant("Total net sales were $391,035 million.");
        history.push_user("And the year before?");

        assert_eq!(history.len(), 3);
        assert_eq!(
            history.format_for_prompt(),
            "User: What was Apple's revenue in 2024?\n\
             Assistant: Total net sales were $391,035 million.\n\
             User: And the year before?"
        );
    }

    #[test]
    fn test_roles_serialize_lowercase() {
        let turn = ConversationTurn::new(TurnRole::Assistant, "hi");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "assistant");
    }
}
