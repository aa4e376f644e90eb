//! Conversation memory
//!
//! Session-owned turn history consumed read-only by the query rewriter

pub mod store;

pub use store::{ConversationHistory, ConversationTurn, TurnRole};
