//! Backend collaborator: the chat and survey-completion endpoints.

pub mod http;

pub use http::HttpBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// Path of the chat endpoint.
pub const CHAT_MESSAGE_PATH: &str = "/api/chat/message";
/// Path of the survey completion endpoint.
pub const SURVEY_COMPLETE_PATH: &str = "/api/user/survey/complete";

/// Request body for [`CHAT_MESSAGE_PATH`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub content: String,
}

/// Successful reply from [`CHAT_MESSAGE_PATH`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// The assistant's reply text.
    pub response: String,
}

/// Error body the backend may attach to a failed request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// The two backend calls the UI makes.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Send one chat message and wait for the assistant's reply.
    async fn send_chat_message(&self, content: &str) -> Result<ChatReply, BackendError>;

    /// Mark the current user's survey as complete.
    async fn complete_survey(&self) -> Result<(), BackendError>;
}
