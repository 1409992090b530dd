use std::collections::BTreeMap;

use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub active: bool,
    pub last_activity: DateTime,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[default]
    Whatsapp,
    Voice,
    Web,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationMessage {
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime,
    pub audio_ref: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    System,
}

impl ConversationMessage {
    pub fn user(text: impl Into<String>, audio_ref: Option<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            timestamp: DateTime::now(),
            audio_ref,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::System,
            text: text.into(),
            timestamp: DateTime::now(),
            audio_ref: None,
        }
    }
}

impl Conversation {
    pub const COLLECTION: &'static str = "conversations";
    /// Inactivity window after which the conversation expires (and the
    /// provider's customer-service window closes).
    pub const SESSION_WINDOW_SECS: i64 = 24 * 60 * 60;

    pub fn context_str(&self, slot: &str) -> Option<&str> {
        self.context.get(slot).and_then(|v| v.as_str())
    }

    /// Whether `now` is still inside the 24h window opened by the last activity.
    pub fn within_window(&self, now: DateTime) -> bool {
        now.timestamp_millis() - self.last_activity.timestamp_millis()
            <= Self::SESSION_WINDOW_SECS * 1000
    }
}
