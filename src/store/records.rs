//! Persisted record types and their storage keys.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Storage keys for the two record kinds.
pub mod keys {
    /// Key for the `SurveyRecord` JSON object.
    pub const SURVEY: &str = "ecosense_survey";
    /// Key for the JSON array of `ChatMessage`s.
    pub const CHAT_HISTORY: &str = "ecosense_chat_history";
}

/// Semantic author of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// The display-oriented sender that always accompanies this role.
    pub fn sender(&self) -> Sender {
        match self {
            Self::User => Sender::User,
            Self::Assistant => Sender::Ai,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// Display-oriented duplicate of [`Role`], kept for consumers reading `sender`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Ai,
}

/// One chat turn. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Sender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ChatMessage {
    /// Create a message with `role` and its matching `sender`, stamped with
    /// a fresh id and the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            sender: Some(role.sender()),
            id: Some(Uuid::new_v4().to_string()),
            timestamp: Some(Utc::now().to_rfc3339()),
        }
    }

    /// A user-authored message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// An assistant-authored message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Persisted survey progress.
///
/// `last_step` is the index of the next step to render; `data` maps step
/// names to their answer payloads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyRecord {
    #[serde(
        default,
        deserialize_with = "lenient_step",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_step: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl SurveyRecord {
    /// Record left behind once the survey has been completed.
    pub fn completed_marker() -> Self {
        Self {
            completed: Some(true),
            ..Self::default()
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed == Some(true)
    }
}

/// Reads `lastStep` as a step index; any other value reads as absent so the
/// rest of the record survives.
fn lenient_step<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(serde_json::Value::as_u64)
        .and_then(|n| u32::try_from(n).ok()))
}
