//! Chat message and conversation history shapes.

use serde::{Deserialize, Serialize};

use crate::dataset::default_limit;
use crate::id::ConversationId;

/// Body of `POST /chat-message`.
///
/// An empty `conversation_id` asks Dify to open a new conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub query: String,
    pub conversation_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    #[default]
    Blocking,
}

/// Outbound body of Dify's `POST /chat-messages`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessagePayload {
    pub inputs: serde_json::Map<String, serde_json::Value>,
    pub query: String,
    pub response_mode: ResponseMode,
    pub conversation_id: String,
    pub user: String,
}

impl ChatMessagePayload {
    /// Blocking-mode payload for `message` on behalf of `user`, with no app inputs.
    #[must_use]
    pub fn blocking(message: ChatMessage, user: impl Into<String>) -> Self {
        Self {
            inputs: serde_json::Map::new(),
            query: message.query,
            response_mode: ResponseMode::Blocking,
            conversation_id: message.conversation_id,
            user: user.into(),
        }
    }
}

/// Query string of `GET /conversations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationListQuery {
    #[serde(default)]
    pub last_id: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for ConversationListQuery {
    fn default() -> Self {
        Self { last_id: String::new(), limit: default_limit() }
    }
}

/// Query string of `GET /messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageListQuery {
    pub conversation_id: ConversationId,
}
