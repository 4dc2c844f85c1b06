use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

/// One entry in the visible transcript or the durable session log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_sender(text, Sender::User)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_sender(text, Sender::Assistant)
    }

    fn with_sender(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: MessageId::generate(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    /// Content equality used by reconciliation: id and text, nothing else.
    pub fn same_content(&self, other: &ChatMessage) -> bool {
        self.id == other.id && self.text == other.text
    }
}
