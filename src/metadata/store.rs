//! Metadata persistence.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::SessionMetadata;
use crate::errors::StoreError;

/// Read/write access to per-session metadata records.
///
/// A missing record is `Ok(None)`, not an error.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn read(&self, session_id: &str) -> Result<Option<SessionMetadata>, StoreError>;

    /// Replace the whole record atomically.
    async fn write(&self, session_id: &str, metadata: &SessionMetadata) -> Result<(), StoreError>;

    /// Merge a partial field set into the record, creating it if absent.
    async fn update(
        &self,
        session_id: &str,
        fields: BTreeMap<String, String>,
    ) -> Result<SessionMetadata, StoreError>;
}

/// One `key=value` file per session under a sessions directory.
#[derive(Debug, Clone)]
pub struct FileMetadataStore {
    sessions_dir: PathBuf,
}

impl FileMetadataStore {
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
        }
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    /// Path of a session's metadata file, after validating the id.
    pub fn path_for(&self, session_id: &str) -> Result<PathBuf, StoreError> {
        validate_session_id(session_id)?;
        Ok(self.sessions_dir.join(session_id))
    }
}

#[async_trait]
impl MetadataStore for FileMetadataStore {
    async fn read(&self, session_id: &str) -> Result<Option<SessionMetadata>, StoreError> {
        let path = self.path_for(session_id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(SessionMetadata::parse(&content))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read { path, source }),
        }
    }

    async fn write(&self, session_id: &str, metadata: &SessionMetadata) -> Result<(), StoreError> {
        let path = self.path_for(session_id)?;
        tokio::fs::create_dir_all(&self.sessions_dir)
            .await
            .map_err(|source| StoreError::CreateDir {
                path: self.sessions_dir.clone(),
                source,
            })?;
        let tmp = self.sessions_dir.join(format!(".{}.tmp", session_id));
        write_atomic(&tmp, &path, metadata.to_file_string().as_bytes()).await
    }

    async fn update(
        &self,
        session_id: &str,
        fields: BTreeMap<String, String>,
    ) -> Result<SessionMetadata, StoreError> {
        let mut metadata = self.read(session_id).await?.unwrap_or_default();
        metadata.apply(fields);
        self.write(session_id, &metadata).await?;
        Ok(metadata)
    }
}

/// Write `contents` to `tmp`, then rename it over `target`.
pub(crate) async fn write_atomic(
    tmp: &Path,
    target: &Path,
    contents: &[u8],
) -> Result<(), StoreError> {
    tokio::fs::write(tmp, contents)
        .await
        .map_err(|source| StoreError::Write {
            path: tmp.to_path_buf(),
            source,
        })?;
    tokio::fs::rename(tmp, target)
        .await
        .map_err(|source| StoreError::Rename {
            from: tmp.to_path_buf(),
            to: target.to_path_buf(),
            source,
        })
}

/// Session ids become file names: `[A-Za-z0-9_.-]+`, no leading dot.
pub fn validate_session_id(session_id: &str) -> Result<(), StoreError> {
    let valid = !session_id.is_empty()
        && !session_id.starts_with('.')
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidSessionId(session_id.to_string()))
    }
}
