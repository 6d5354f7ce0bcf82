//! Typed error hierarchy for foreman.
//!
//! Three enums cover the three failure surfaces:
//! - `StoreError` — metadata and artifact persistence failures
//! - `CheckError` — everything a single `PhaseManager::check` cycle can fail with
//! - `ConfigError` — unreadable or unparseable `foreman.toml`

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the file-backed metadata and artifact stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {from} into place at {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid session id '{0}': only letters, digits, '-', '_' and '.' are allowed")]
    InvalidSessionId(String),

    #[error("Invalid reviewer role '{0}': expected architect, developer or product")]
    InvalidRole(String),

    #[error("{0} is not a review phase: review artifacts exist only for plan_review and code_review")]
    NotAReviewPhase(crate::phase::Phase),

    #[error("Failed to serialize artifact: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors from one evaluation cycle of the phase manager.
///
/// Every variant aborts the cycle. Metadata is left at its last successfully
/// written value, so the caller can log and retry on the next tick.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Metadata store error: {0}")]
    Metadata(#[source] StoreError),

    #[error("Artifact store error: {0}")]
    Artifacts(#[source] StoreError),

    #[error("Failed to list sessions: {0}")]
    Roster(#[source] anyhow::Error),

    #[error("Failed to spawn {role} sub-session: {source}")]
    Spawn {
        role: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Errors from loading `foreman.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
