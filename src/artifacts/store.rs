//! Artifact persistence under `<workspace>/.foreman/`.
//!
//! ```text
//! .foreman/
//!   plan.md
//!   reviews/
//!     plan_review/round-1/architect.json
//!     code_review/round-2/product.json
//!     code_review/round-2/product-2.json   # second submission, same round
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use super::plan::PlanArtifact;
use super::review::{RawReviewArtifact, ReviewArtifact};
use crate::errors::StoreError;
use crate::metadata::store::write_atomic;
use crate::phase::Phase;

/// Directory under the workspace holding all artifacts.
pub const ARTIFACT_DIR: &str = ".foreman";

const PLAN_FILE: &str = "plan.md";
const REVIEWS_DIR: &str = "reviews";

/// Read/write access to a workspace's artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn read_plan(&self, workspace: &Path) -> Result<Option<PlanArtifact>, StoreError>;

    /// Every usable review record for (phase, round). Malformed records are skipped.
    async fn read_reviews(
        &self,
        workspace: &Path,
        phase: Phase,
        round: u32,
    ) -> Result<Vec<ReviewArtifact>, StoreError>;

    async fn write_plan(
        &self,
        workspace: &Path,
        plan: &PlanArtifact,
    ) -> Result<PathBuf, StoreError>;

    /// Append a review record. Never overwrites an earlier submission.
    async fn write_review(
        &self,
        workspace: &Path,
        artifact: &ReviewArtifact,
    ) -> Result<PathBuf, StoreError>;
}

/// Artifacts stored as plain files inside each workspace.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileArtifactStore;

impl FileArtifactStore {
    pub fn new() -> Self {
        Self
    }

    pub fn plan_path(workspace: &Path) -> PathBuf {
        workspace.join(ARTIFACT_DIR).join(PLAN_FILE)
    }

    pub fn reviews_dir(workspace: &Path, phase: Phase, round: u32) -> PathBuf {
        workspace
            .join(ARTIFACT_DIR)
            .join(REVIEWS_DIR)
            .join(phase.as_str())
            .join(format!("round-{}", round))
    }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn read_plan(&self, workspace: &Path) -> Result<Option<PlanArtifact>, StoreError> {
        let path = Self::plan_path(workspace);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                // Free text: a stray invalid byte must not block planning.
                let content = String::from_utf8_lossy(&bytes);
                if matches!(content, Cow::Owned(_)) {
                    warn!(path = %path.display(), "Plan contains invalid UTF-8, replacing bad bytes");
                }
                Ok(Some(PlanArtifact::parse(&content)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read { path, source }),
        }
    }

    async fn read_reviews(
        &self,
        workspace: &Path,
        phase: Phase,
        round: u32,
    ) -> Result<Vec<ReviewArtifact>, StoreError> {
        if !phase.is_review() {
            return Ok(Vec::new());
        }
        let dir = Self::reviews_dir(workspace, phase, round);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Read { path: dir, source }),
        };

        let mut paths = Vec::new();
        loop {
            let entry = entries.next_entry().await.map_err(|source| StoreError::Read {
                path: dir.clone(),
                source,
            })?;
            let Some(entry) = entry else { break };
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut artifacts = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|source| StoreError::Read {
                    path: path.clone(),
                    source,
                })?;
            let fallback = modified_time(&path).await;
            // Undecodable bytes are a malformed record, not an I/O failure.
            let parsed = serde_json::from_slice::<RawReviewArtifact>(&bytes)
                .map_err(|e| e.to_string())
                .and_then(|raw| raw.into_artifact(phase, round, fallback));
            match parsed {
                Ok(artifact) => artifacts.push(artifact),
                Err(reason) => {
                    warn!(path = %path.display(), %reason, "Skipping malformed review artifact");
                }
            }
        }
        Ok(artifacts)
    }

    async fn write_plan(
        &self,
        workspace: &Path,
        plan: &PlanArtifact,
    ) -> Result<PathBuf, StoreError> {
        let path = Self::plan_path(workspace);
        let dir = workspace.join(ARTIFACT_DIR);
        create_dir(&dir).await?;
        write_atomic(&dir.join(".plan.md.tmp"), &path, plan.render().as_bytes()).await?;
        Ok(path)
    }

    async fn write_review(
        &self,
        workspace: &Path,
        artifact: &ReviewArtifact,
    ) -> Result<PathBuf, StoreError> {
        if !artifact.phase.is_review() {
            return Err(StoreError::NotAReviewPhase(artifact.phase));
        }
        let dir = Self::reviews_dir(workspace, artifact.phase, artifact.round);
        create_dir(&dir).await?;
        let body = serde_json::to_string_pretty(artifact)?;

        let mut attempt = 1u32;
        loop {
            let name = if attempt == 1 {
                format!("{}.json", artifact.role)
            } else {
                format!("{}-{}.json", artifact.role, attempt)
            };
            let path = dir.join(name);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    let result = async {
                        file.write_all(body.as_bytes()).await?;
                        file.flush().await
                    }
                    .await;
                    result.map_err(|source| StoreError::Write {
                        path: path.clone(),
                        source,
                    })?;
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(source) => return Err(StoreError::Write { path, source }),
            }
        }
    }
}

async fn create_dir(dir: &Path) -> Result<(), StoreError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| StoreError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })
}

/// File mtime, for records written without a timestamp.
async fn modified_time(path: &Path) -> DateTime<Utc> {
    tokio::fs::metadata(path)
        .await
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}
