//! Review gate: turns one round's review records into a single verdict.

use std::collections::BTreeMap;

use crate::artifacts::{ReviewArtifact, ReviewDecision, ReviewRole};

/// Outcome of a review round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    /// Every required role approved and nobody requested changes.
    Approved,
    /// At least one record requests changes.
    ChangesRequested,
    /// Some required roles haven't submitted yet.
    Pending,
}

impl GateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::ChangesRequested => "changes_requested",
            Self::Pending => "pending",
        }
    }
}

/// Per-role view of one review round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewTally {
    pub status: GateStatus,
    /// Most decisive decision per role that submitted anything.
    pub decisions: BTreeMap<ReviewRole, ReviewDecision>,
    /// Required roles with no record at all.
    pub missing: Vec<ReviewRole>,
}

impl ReviewTally {
    /// Tally records against the required roles.
    ///
    /// Any changes-requested record wins, whoever wrote it. Otherwise the
    /// round is approved once every required role has an approval.
    pub fn from_artifacts(required: &[ReviewRole], artifacts: &[ReviewArtifact]) -> Self {
        let mut decisions: BTreeMap<ReviewRole, ReviewDecision> = BTreeMap::new();
        for artifact in artifacts {
            decisions
                .entry(artifact.role)
                .and_modify(|existing| {
                    if artifact.decision.is_more_decisive_than(existing) {
                        *existing = artifact.decision;
                    }
                })
                .or_insert(artifact.decision);
        }

        let missing: Vec<ReviewRole> = required
            .iter()
            .filter(|role| !decisions.contains_key(*role))
            .copied()
            .collect();

        let status = if decisions
            .values()
            .any(|d| *d == ReviewDecision::ChangesRequested)
        {
            GateStatus::ChangesRequested
        } else if missing.is_empty()
            && required
                .iter()
                .all(|role| decisions.get(role).is_some_and(ReviewDecision::is_approved))
        {
            GateStatus::Approved
        } else {
            GateStatus::Pending
        };

        Self {
            status,
            decisions,
            missing,
        }
    }

    pub fn approved_by(&self) -> Vec<ReviewRole> {
        self.roles_with(ReviewDecision::Approved)
    }

    pub fn changes_requested_by(&self) -> Vec<ReviewRole> {
        self.roles_with(ReviewDecision::ChangesRequested)
    }

    fn roles_with(&self, decision: ReviewDecision) -> Vec<ReviewRole> {
        self.decisions
            .iter()
            .filter(|(_, d)| **d == decision)
            .map(|(role, _)| *role)
            .collect()
    }
}
