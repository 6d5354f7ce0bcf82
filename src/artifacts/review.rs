//! Review decision records.
//!
//! One record per (phase, round, role). Records are append-only: a reviewer
//! that submits twice in a round leaves two records, and readers must cope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::StoreError;
use crate::phase::Phase;

/// Reviewer roles. Review swarms always run all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewRole {
    Architect,
    Developer,
    Product,
}

impl ReviewRole {
    /// The fixed reviewer set, in spawn order.
    pub const ALL: [ReviewRole; 3] = [
        ReviewRole::Architect,
        ReviewRole::Developer,
        ReviewRole::Product,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Architect => "architect",
            Self::Developer => "developer",
            Self::Product => "product",
        }
    }

    /// What this reviewer is expected to look at.
    pub fn focus_areas(&self) -> &'static [&'static str] {
        match self {
            Self::Architect => &[
                "Module boundaries and separation of concerns",
                "Data model and interface design",
                "Failure handling and recovery paths",
                "Concurrency and consistency risks",
                "Fit with existing architecture",
            ],
            Self::Developer => &[
                "Correctness and edge cases",
                "Test coverage of new behavior",
                "Readability and naming",
                "Error handling at call sites",
                "Unnecessary complexity",
            ],
            Self::Product => &[
                "Does the change solve the stated issue",
                "User-visible behavior and messaging",
                "Scope creep or missing requirements",
                "Documentation of new behavior",
            ],
        }
    }
}

impl fmt::Display for ReviewRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReviewRole {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "architect" => Ok(Self::Architect),
            "developer" => Ok(Self::Developer),
            "product" => Ok(Self::Product),
            _ => Err(StoreError::InvalidRole(s.to_string())),
        }
    }
}

/// A reviewer's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    ChangesRequested,
}

impl ReviewDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::ChangesRequested => "changes_requested",
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Changes-requested outranks approval when one role left both.
    pub fn is_more_decisive_than(&self, other: &ReviewDecision) -> bool {
        matches!(
            (self, other),
            (Self::ChangesRequested, Self::Approved)
        )
    }
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReviewDecision {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "approved" | "approve" => Ok(Self::Approved),
            "changes_requested" | "request_changes" => Ok(Self::ChangesRequested),
            _ => anyhow::bail!(
                "Invalid review decision '{}'. Valid values: approved, changes_requested",
                s
            ),
        }
    }
}

/// One reviewer's decision for one (phase, round).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewArtifact {
    pub phase: Phase,
    pub round: u32,
    pub role: ReviewRole,
    pub decision: ReviewDecision,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
}

impl ReviewArtifact {
    pub fn new(phase: Phase, round: u32, role: ReviewRole, decision: ReviewDecision) -> Self {
        Self {
            phase,
            round,
            role,
            decision,
            timestamp: Utc::now(),
            notes: String::new(),
        }
    }

    pub fn approved(phase: Phase, round: u32, role: ReviewRole) -> Self {
        Self::new(phase, round, role, ReviewDecision::Approved)
    }

    pub fn changes_requested(phase: Phase, round: u32, role: ReviewRole) -> Self {
        Self::new(phase, round, role, ReviewDecision::ChangesRequested)
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = notes.to_string();
        self
    }
}

/// Loosely-typed view of a record on disk. Anything may be missing.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawReviewArtifact {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    decision: Option<String>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    notes: Option<String>,
}

impl RawReviewArtifact {
    /// Promote to a full record located at (phase, round).
    ///
    /// Returns why the record is unusable when role or decision is missing
    /// or invalid. A missing timestamp falls back to `fallback_timestamp`.
    pub(crate) fn into_artifact(
        self,
        phase: Phase,
        round: u32,
        fallback_timestamp: DateTime<Utc>,
    ) -> Result<ReviewArtifact, String> {
        let role = self
            .role
            .ok_or_else(|| "missing role".to_string())?
            .parse::<ReviewRole>()
            .map_err(|e| e.to_string())?;
        let decision = self
            .decision
            .ok_or_else(|| "missing decision".to_string())?
            .parse::<ReviewDecision>()
            .map_err(|e| e.to_string())?;
        Ok(ReviewArtifact {
            phase,
            round,
            role,
            decision,
            timestamp: self.timestamp.unwrap_or(fallback_timestamp),
            notes: self.notes.unwrap_or_default(),
        })
    }
}
