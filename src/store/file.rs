//! File-backed session medium.
//!
//! The session is a directory on disk holding one `<key>.json` file per key.
//! Removing the directory ends the session.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::medium::SessionMedium;
use crate::error::StorageError;

/// Session medium rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileMedium {
    base_path: PathBuf,
}

impl FileMedium {
    /// Create a medium rooted at `base_path`. The directory is created lazily.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a key to its file, rejecting keys that could escape the directory.
    fn resolve_key(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid session key: {key:?}"),
            )
            .into());
        }
        Ok(self.base_path.join(format!("{key}.json")))
    }
}

#[async_trait]
impl SessionMedium for FileMedium {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.resolve_key(key)?;
        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.resolve_key(key)?;
        fs::create_dir_all(&self.base_path).await?;
        fs::write(&path, value).await?;
        debug!(path = %path.display(), bytes = value.len(), "Session file written");
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve_key(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let medium = FileMedium::new(dir.path().join("session"));

        assert!(medium.get_item("ecosense_survey").await.unwrap().is_none());

        medium.set_item("ecosense_survey", r#"{"lastStep":1}"#).await.unwrap();
        assert_eq!(
            medium.get_item("ecosense_survey").await.unwrap().as_deref(),
            Some(r#"{"lastStep":1}"#)
        );
        assert!(dir.path().join("session/ecosense_survey.json").exists());

        medium.remove_item("ecosense_survey").await.unwrap();
        medium.remove_item("ecosense_survey").await.unwrap();
        assert!(medium.get_item("ecosense_survey").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let medium = FileMedium::new(dir.path());

        for key in ["../escape", "a/b", "", "dot.key"] {
            assert!(
                matches!(medium.set_item(key, "x").await, Err(StorageError::Io(_))),
                "key {key:?} should be rejected"
            );
        }
    }
}
