//! Shared data models.
//!
//! Domain values flowing through the two pipelines, plus the action-server
//! wire format used by the dialogue manager to invoke actions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Number of passages retrieved per question.
pub const TOP_K: usize = 3;

/// Query embedding.
pub type EmbeddingVector = Vec<f32>;

/// One conversational turn's question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub role: String,
    pub language: String,
}

/// A knowledge-base passage returned by similarity search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetrievedDocument {
    pub text: String,
}

/// Final answer for the caller. `image_url` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerResult {
    pub text: String,
    pub image_url: String,
}

/// Action invocation sent by the dialogue manager.
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub next_action: String,
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub tracker: Tracker,
    #[serde(default)]
    pub domain: Option<Value>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Conversation state snapshot.
#[derive(Debug, Default, Deserialize)]
pub struct Tracker {
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub slots: HashMap<String, Value>,
    #[serde(default)]
    pub latest_message: LatestMessage,
}

impl Tracker {
    /// String value of a slot, if set and non-blank.
    pub fn slot_str(&self, name: &str) -> Option<&str> {
        self.slots
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LatestMessage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub value: Value,
}

/// Events and utterances returned from an action.
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct ActionResponse {
    pub events: Vec<ActionEvent>,
    pub responses: Vec<BotMessage>,
}

impl ActionResponse {
    pub fn utter(message: BotMessage) -> Self {
        Self {
            events: Vec::new(),
            responses: vec![message],
        }
    }

    pub fn events(events: Vec<ActionEvent>) -> Self {
        Self {
            events,
            responses: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "event")]
pub enum ActionEvent {
    #[serde(rename = "slot")]
    SlotSet { name: String, value: Value },
}

impl ActionEvent {
    pub fn slot(name: &str, value: impl Into<Value>) -> Self {
        ActionEvent::SlotSet {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct BotMessage {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl BotMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }
}

/// Body returned when an action cannot be run at all.
#[derive(Debug, Serialize)]
pub struct ActionError {
    pub error: String,
    pub action_name: String,
}
