// src/message.rs
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    /// Older backends label assistant turns `ai`.
    #[serde(alias = "ai")]
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Body of `GET /context/{user_id}`.
#[derive(Debug, Default, Deserialize)]
pub struct ContextResponse {
    #[serde(default)]
    context: Option<ContextPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContextPayload {
    Stored {
        #[serde(default)]
        messages: Option<Vec<serde_json::Value>>,
    },
    // Backends without stored context answer `"context": "{}"`.
    Placeholder(serde::de::IgnoredAny),
}

impl ContextResponse {
    /// Stored messages in order. Entries that are not chat messages, such as
    /// roles this client does not show, are skipped with a warning.
    pub fn into_messages(self) -> Vec<ChatMessage> {
        let Some(ContextPayload::Stored { messages }) = self.context else {
            return Vec::new();
        };
        messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<ChatMessage>(raw.clone()) {
                Ok(message) => Some(message),
                Err(e) => {
                    tracing::warn!(role = %raw["role"], error = %e, "skipping stored message");
                    None
                }
            })
            .collect()
    }
}

/// Body of `POST /context`. An empty `messages` list clears stored history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetContextRequest {
    pub user_id: String,
    pub messages: Vec<ChatMessage>,
}

impl ResetContextRequest {
    pub fn clear(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), messages: Vec::new() }
    }
}

/// Query string of `GET /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatQuery {
    pub user_id: String,
    pub message: String,
}
