//! Per-session metadata: the durable source of truth for phase and rounds.
//!
//! A record is a flat string map. Round counters are stored as decimal
//! strings and parsed back to integers at the start of every evaluation.

pub mod store;

pub use store::{FileMetadataStore, MetadataStore};

use std::collections::BTreeMap;
use tracing::warn;

use crate::phase::Phase;

pub const KEY_PHASE: &str = "phase";
pub const KEY_PLAN_ROUND: &str = "planRound";
pub const KEY_REVIEW_ROUND: &str = "reviewRound";
pub const KEY_IMPLEMENTATION_ROUND: &str = "implementationRound";
pub const KEY_CODE_REVIEW_ROUND: &str = "codeReviewRound";
pub const KEY_IMPLEMENTATION_SWARM_ROUND: &str = "implementationSwarmRound";
pub const KEY_BRANCH: &str = "branch";
pub const KEY_PROJECT: &str = "project";
pub const KEY_ISSUE: &str = "issue";

/// Round counters. `None` means unset, which reads as round 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rounds {
    pub plan: Option<u32>,
    pub review: Option<u32>,
    pub implementation: Option<u32>,
    pub code_review: Option<u32>,
}

impl Rounds {
    pub fn plan(&self) -> u32 {
        self.plan.unwrap_or(1)
    }

    pub fn review(&self) -> u32 {
        self.review.unwrap_or(1)
    }

    pub fn implementation(&self) -> u32 {
        self.implementation.unwrap_or(1)
    }

    pub fn code_review(&self) -> u32 {
        self.code_review.unwrap_or(1)
    }

    /// Every counter set, unset ones at 1.
    pub fn resolved(&self) -> Self {
        Self {
            plan: Some(self.plan()),
            review: Some(self.review()),
            implementation: Some(self.implementation()),
            code_review: Some(self.code_review()),
        }
    }

    /// The round field that scopes the given review phase.
    pub fn for_review_phase(&self, phase: Phase) -> Option<u32> {
        match phase {
            Phase::PlanReview => Some(self.review()),
            Phase::CodeReview => Some(self.code_review()),
            _ => None,
        }
    }
}

/// One session's metadata record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMetadata {
    pub phase: Option<Phase>,
    pub rounds: Rounds,
    /// Implementation round whose work has been handed out to the swarm.
    pub implementation_swarm_round: Option<u32>,
    pub branch: Option<String>,
    pub project: Option<String>,
    pub issue: Option<String>,
    /// Keys foreman doesn't own, preserved on rewrite.
    pub extra: BTreeMap<String, String>,
}

impl SessionMetadata {
    /// Parse `key=value` lines. Blank lines, `#` comments and lines without
    /// `=` are ignored; values keep everything after the first `=`.
    pub fn parse(content: &str) -> Self {
        let fields = content
            .lines()
            .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), value.to_string()))
            .collect();
        Self::from_fields(fields)
    }

    pub fn from_fields(fields: BTreeMap<String, String>) -> Self {
        let mut metadata = Self::default();
        metadata.apply(fields);
        metadata
    }

    /// Merge a (possibly partial) field set into this record.
    pub fn apply(&mut self, fields: BTreeMap<String, String>) {
        for (key, value) in fields {
            match key.as_str() {
                KEY_PHASE => {
                    self.phase = match value.parse::<Phase>() {
                        Ok(phase) => Some(phase),
                        Err(_) => {
                            warn!(value = %value, "Unknown phase in metadata, treating as unset");
                            None
                        }
                    }
                }
                KEY_PLAN_ROUND => self.rounds.plan = parse_round(&key, &value),
                KEY_REVIEW_ROUND => self.rounds.review = parse_round(&key, &value),
                KEY_IMPLEMENTATION_ROUND => {
                    self.rounds.implementation = parse_round(&key, &value)
                }
                KEY_CODE_REVIEW_ROUND => self.rounds.code_review = parse_round(&key, &value),
                KEY_IMPLEMENTATION_SWARM_ROUND => {
                    self.implementation_swarm_round = parse_round(&key, &value)
                }
                KEY_BRANCH => self.branch = Some(value),
                KEY_PROJECT => self.project = Some(value),
                KEY_ISSUE => self.issue = Some(value),
                _ => {
                    self.extra.insert(key, value);
                }
            }
        }
    }

    /// Flatten to the persisted string map. Unset fields are omitted.
    pub fn to_fields(&self) -> BTreeMap<String, String> {
        let mut fields = self.extra.clone();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                fields.insert(key.to_string(), value);
            }
        };
        put(KEY_PHASE, self.phase.map(|p| p.as_str().to_string()));
        put(KEY_PLAN_ROUND, self.rounds.plan.map(|r| r.to_string()));
        put(KEY_REVIEW_ROUND, self.rounds.review.map(|r| r.to_string()));
        put(
            KEY_IMPLEMENTATION_ROUND,
            self.rounds.implementation.map(|r| r.to_string()),
        );
        put(
            KEY_CODE_REVIEW_ROUND,
            self.rounds.code_review.map(|r| r.to_string()),
        );
        put(
            KEY_IMPLEMENTATION_SWARM_ROUND,
            self.implementation_swarm_round.map(|r| r.to_string()),
        );
        put(KEY_BRANCH, self.branch.clone());
        put(KEY_PROJECT, self.project.clone());
        put(KEY_ISSUE, self.issue.clone());
        fields
    }

    /// Render as `key=value` lines in sorted key order.
    pub fn to_file_string(&self) -> String {
        self.to_fields()
            .into_iter()
            .map(|(key, value)| format!("{}={}\n", key, value))
            .collect()
    }
}

/// Decimal round counter. Non-numeric or zero values read as unset.
fn parse_round(key: &str, value: &str) -> Option<u32> {
    match value.trim().parse::<u32>() {
        Ok(round) if round > 0 => Some(round),
        _ => {
            warn!(key, value, "Corrupt round counter in metadata, defaulting to round 1");
            None
        }
    }
}
