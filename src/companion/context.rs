//! Conversation context: history, delivery callbacks, and turn accounting.

use std::sync::Arc;

use async_trait::async_trait;

use crate::companion::block::Block;

/// Opaque metadata passed through to every delivery callback.
pub type Metadata = serde_json::Value;

/// A delivery callback supplied by the transport layer. Delivers a batch of
/// blocks to the end user; errors propagate to the turn driver, which does
/// not retry.
#[async_trait]
pub trait EmitFn: Send + Sync {
    async fn emit(&self, blocks: &[Block], metadata: &Metadata) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Companion,
}

/// One prior message in a conversation.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
}

impl HistoryEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn companion(text: impl Into<String>) -> Self {
        Self { role: Role::Companion, text: text.into() }
    }
}

/// Context for one agent turn. History and callbacks are owned by the
/// caller; the core only reads them.
pub struct ConversationContext {
    pub chat_id: i64,
    pub history: Vec<HistoryEntry>,
    pub emit_funcs: Vec<Arc<dyn EmitFn>>,
    pub metadata: Metadata,
}

impl ConversationContext {
    pub fn new(chat_id: i64, history: Vec<HistoryEntry>, emit_funcs: Vec<Arc<dyn EmitFn>>) -> Self {
        Self {
            chat_id,
            history,
            emit_funcs,
            metadata: serde_json::json!({ "chat_id": chat_id }),
        }
    }
}

/// Conversation turns consumed so far, approximated as half the message
/// count (one user message plus one companion reply per turn). Rounds down,
/// so this is a display helper; the quota gate compares raw message counts
/// to avoid giving a half-finished exchange a free pass.
pub fn turns_used(history: &[HistoryEntry]) -> usize {
    history.len() / 2
}
