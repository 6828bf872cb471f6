use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attachment::Attachment;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    #[serde(default = "generate_id")]
    pub id: String,
    pub role: Role,
    pub text: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// True while the model is still delivering text for this message.
    #[serde(default)]
    pub streaming: bool,
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

impl Message {
    pub fn user(text: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            id: generate_id(),
            role: Role::User,
            text: text.into(),
            created_at: Utc::now(),
            attachments,
            streaming: false,
        }
    }

    /// Empty model message that receives streamed text.
    pub fn model_placeholder() -> Self {
        Self {
            id: generate_id(),
            role: Role::Model,
            text: String::new(),
            created_at: Utc::now(),
            attachments: Vec::new(),
            streaming: true,
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            role: Role::Model,
            text: text.into(),
            created_at: Utc::now(),
            attachments: Vec::new(),
            streaming: false,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// Per-request toggles. Read when a turn is submitted, never stored on messages.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatOptions {
    /// Extended reasoning: stronger model, higher temperature, thinking budget.
    #[serde(default)]
    pub thinking: bool,
    /// Web grounding through the search tool.
    #[serde(default)]
    pub search: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(generate_id())
    }
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// Index of the most recent user message.
    pub fn last_user_index(&self) -> Option<usize> {
        self.messages.iter().rposition(Message::is_user)
    }

    /// Drop every message from `index` onwards.
    pub fn truncate(&mut self, index: usize) -> Vec<Message> {
        if index >= self.messages.len() {
            return Vec::new();
        }
        let removed = self.messages.split_off(index);
        self.updated_at = Utc::now();
        removed
    }

    /// User messages in chronological order (the audit trail).
    pub fn user_queries(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.is_user())
    }

    /// Messages still receiving snapshots. At most one while a turn runs.
    pub fn streaming_count(&self) -> usize {
        self.messages.iter().filter(|m| m.streaming).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Model).unwrap(), "\"model\"");
        assert_eq!(Role::Model.as_str(), "model");
    }

    #[test]
    fn placeholder_is_empty_and_streaming() {
        let msg = Message::model_placeholder();
        assert_eq!(msg.role, Role::Model);
        assert!(msg.text.is_empty());
        assert!(msg.streaming);
    }

    #[test]
    fn message_ids_are_unique() {
        let a = Message::user("a", Vec::new());
        let b = Message::user("a", Vec::new());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn empty_attachments_are_not_serialized() {
        let msg = Message::user("hello", Vec::new());
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("attachments").is_none());
    }

    #[test]
    fn last_user_index_skips_trailing_model() {
        let mut session = Session::new("s");
        session.add_message(Message::user("Q1", Vec::new()));
        session.add_message(Message::model("A1"));
        session.add_message(Message::user("Q2", Vec::new()));
        session.add_message(Message::model("A2"));

        assert_eq!(session.last_user_index(), Some(2));
    }

    #[test]
    fn truncate_returns_removed_tail() {
        let mut session = Session::new("s");
        session.add_message(Message::user("Q", Vec::new()));
        session.add_message(Message::model("A"));

        let removed = session.truncate(1);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].text, "A");
        assert_eq!(session.len(), 1);

        assert!(session.truncate(5).is_empty());
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn user_queries_filters_model_turns() {
        let mut session = Session::default();
        session.add_message(Message::user("first", Vec::new()));
        session.add_message(Message::model("answer"));
        session.add_message(Message::user("second", Vec::new()));

        let texts: Vec<&str> = session.user_queries().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn streaming_count_tracks_placeholders() {
        let mut session = Session::default();
        session.add_message(Message::user("Q", Vec::new()));
        assert_eq!(session.streaming_count(), 0);

        session.add_message(Message::model_placeholder());
        assert_eq!(session.streaming_count(), 1);

        if let Some(last) = session.messages.last_mut() {
            last.streaming = false;
        }
        assert_eq!(session.streaming_count(), 0);
    }
}
