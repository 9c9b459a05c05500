//! Typed session store over a raw [`SessionMedium`].
//!
//! Every operation is best-effort: medium and serialization failures are
//! logged here and turned into a no-op or an empty value. Nothing above this
//! layer ever sees a storage error.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use super::medium::SessionMedium;
use super::records::{ChatMessage, SurveyRecord, keys};
use crate::error::StorageError;

/// Get/save/clear for the two session record kinds.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Replace the survey record.
    async fn save_survey(&self, survey: &SurveyRecord);

    /// The survey record, or `None` if absent or unreadable.
    async fn get_survey(&self) -> Option<SurveyRecord>;

    /// Remove the survey record.
    async fn clear_survey(&self);

    /// Append one message to the persisted history.
    ///
    /// Read-modify-write of the whole sequence; two overlapping calls can
    /// lose an update.
    async fn save_chat_message(&self, message: &ChatMessage);

    /// The persisted history, empty if absent or unreadable.
    async fn get_chat_history(&self) -> Vec<ChatMessage>;

    /// Remove the persisted history.
    async fn clear_chat_history(&self);
}

/// [`SessionStore`] backed by any [`SessionMedium`], JSON-encoded.
#[derive(Clone)]
pub struct SessionStorageManager {
    medium: Arc<dyn SessionMedium>,
}

impl SessionStorageManager {
    pub fn new(medium: Arc<dyn SessionMedium>) -> Self {
        Self { medium }
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.medium.get_item(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.medium.set_item(key, &raw).await
    }
}

#[async_trait]
impl SessionStore for SessionStorageManager {
    async fn save_survey(&self, survey: &SurveyRecord) {
        if let Err(e) = self.write(keys::SURVEY, survey).await {
            error!(key = keys::SURVEY, error = %e, "Error saving survey to session storage");
        }
    }

    async fn get_survey(&self) -> Option<SurveyRecord> {
        match self.read(keys::SURVEY).await {
            Ok(survey) => survey,
            Err(e) => {
                error!(key = keys::SURVEY, error = %e, "Error retrieving survey from session storage");
                None
            }
        }
    }

    async fn clear_survey(&self) {
        if let Err(e) = self.medium.remove_item(keys::SURVEY).await {
            error!(key = keys::SURVEY, error = %e, "Error clearing survey from session storage");
        }
    }

    async fn save_chat_message(&self, message: &ChatMessage) {
        let mut history = self.get_chat_history().await;
        history.push(message.clone());
        match self.write(keys::CHAT_HISTORY, &history).await {
            Ok(()) => debug!(len = history.len(), "Chat message saved"),
            Err(e) => error!(
                key = keys::CHAT_HISTORY,
                error = %e,
                "Error saving chat message to session storage"
            ),
        }
    }

    async fn get_chat_history(&self) -> Vec<ChatMessage> {
        match self.read(keys::CHAT_HISTORY).await {
            Ok(history) => history.unwrap_or_default(),
            Err(e) => {
                error!(
                    key = keys::CHAT_HISTORY,
                    error = %e,
                    "Error retrieving chat history from session storage"
                );
                Vec::new()
            }
        }
    }

    async fn clear_chat_history(&self) {
        if let Err(e) = self.medium.remove_item(keys::CHAT_HISTORY).await {
            error!(
                key = keys::CHAT_HISTORY,
                error = %e,
                "Error clearing chat history from session storage"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::memory::MemoryMedium;
    use crate::store::records::Role;

    fn store_over(medium: &Arc<MemoryMedium>) -> SessionStorageManager {
        SessionStorageManager::new(Arc::clone(medium) as Arc<dyn SessionMedium>)
    }

    #[tokio::test]
    async fn absent_records_read_as_defaults() {
        let store = store_over(&Arc::new(MemoryMedium::new()));
        assert!(store.get_survey().await.is_none());
        assert!(store.get_chat_history().await.is_empty());
    }

    #[tokio::test]
    async fn survey_save_get_clear() {
        let medium = Arc::new(MemoryMedium::new());
        let store = store_over(&medium);
        let record = SurveyRecord {
            last_step: Some(1),
            data: json!({"healthProfile": {}}).as_object().cloned(),
            completed: None,
        };

        store.save_survey(&record).await;
        assert_eq!(store.get_survey().await, Some(record));

        let raw = medium.get_item(keys::SURVEY).await.unwrap().unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&raw).unwrap(),
            json!({"lastStep": 1, "data": {"healthProfile": {}}})
        );

        store.clear_survey().await;
        assert!(store.get_survey().await.is_none());
        assert!(medium.is_empty().await);
    }

    #[tokio::test]
    async fn chat_messages_append_in_order() {
        let medium = Arc::new(MemoryMedium::new());
        let store = store_over(&medium);

        store.save_chat_message(&ChatMessage::user("hello")).await;
        store.save_chat_message(&ChatMessage::assistant("hi there")).await;

        let history = store.get_chat_history().await;
        let turns: Vec<(Role, &str)> = history.iter().map(|m| (m.role, m.content.as_str())).collect();
        assert_eq!(turns, vec![(Role::User, "hello"), (Role::Assistant, "hi there")]);

        store.clear_chat_history().await;
        assert!(store.get_chat_history().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_values_read_as_absent() {
        let medium = Arc::new(MemoryMedium::new());
        medium.set_item(keys::SURVEY, "{not json").await.unwrap();
        medium.set_item(keys::CHAT_HISTORY, r#"{"role":"user"}"#).await.unwrap();
        let store = store_over(&medium);

        assert!(store.get_survey().await.is_none());
        assert!(store.get_chat_history().await.is_empty());

        // A save over corrupt history starts a fresh sequence.
        store.save_chat_message(&ChatMessage::user("again")).await;
        assert_eq!(store.get_chat_history().await.len(), 1);
    }

    #[tokio::test]
    async fn unavailable_medium_never_propagates() {
        let medium = Arc::new(MemoryMedium::new());
        let store = store_over(&medium);
        store.save_chat_message(&ChatMessage::user("kept")).await;
        medium.set_unavailable(true);

        store.save_survey(&SurveyRecord::default()).await;
        store.save_chat_message(&ChatMessage::user("lost")).await;
        store.clear_chat_history().await;
        store.clear_survey().await;
        assert!(store.get_survey().await.is_none());
        assert!(store.get_chat_history().await.is_empty());

        medium.set_unavailable(false);
        let history = store.get_chat_history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "kept");
    }

    #[tokio::test]
    async fn quota_exceeded_drops_the_write_silently() {
        let medium = Arc::new(MemoryMedium::with_quota(200));
        let store = store_over(&medium);

        store.save_chat_message(&ChatMessage::user("a".repeat(500))).await;
        assert!(store.get_chat_history().await.is_empty());
    }

    #[tokio::test]
    async fn overlapping_appends_can_lose_an_update() {
        // Two writers that both read before either writes: last write wins.
        let medium = Arc::new(MemoryMedium::new());
        let store = store_over(&medium);

        let mut first = store.get_chat_history().await;
        let mut second = store.get_chat_history().await;
        first.push(ChatMessage::user("one"));
        second.push(ChatMessage::user("two"));
        store.write(keys::CHAT_HISTORY, &first).await.unwrap();
        store.write(keys::CHAT_HISTORY, &second).await.unwrap();

        let history = store.get_chat_history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "two");
    }
}
