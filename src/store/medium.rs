//! Raw session-scoped key/value medium.

use async_trait::async_trait;

use crate::error::StorageError;

/// A session-scoped string key/value medium.
///
/// Contents live for one session and are gone when it ends. Every operation
/// may fail; callers above the session store never see those failures.
#[async_trait]
pub trait SessionMedium: Send + Sync {
    /// Read the raw value stored under `key`, if any.
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}
