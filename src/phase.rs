//! Workflow phases for a primary session.
//!
//! A session moves forward through
//! `Planning → PlanReview → Implementing → CodeReview → ReadyToMerge`.
//! Changes-requested review decisions move it backward one step
//! (`PlanReview → Planning`, `CodeReview → Implementing`). `ReadyToMerge` is
//! terminal: an external merge workflow takes over from there.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discrete stage of the workflow state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Planning,
    PlanReview,
    Implementing,
    CodeReview,
    ReadyToMerge,
}

impl Phase {
    /// All phases in forward order.
    pub const ALL: [Phase; 5] = [
        Phase::Planning,
        Phase::PlanReview,
        Phase::Implementing,
        Phase::CodeReview,
        Phase::ReadyToMerge,
    ];

    /// Stable string form used in metadata files and artifact paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Planning => "planning",
            Phase::PlanReview => "plan_review",
            Phase::Implementing => "implementing",
            Phase::CodeReview => "code_review",
            Phase::ReadyToMerge => "ready_to_merge",
        }
    }

    /// Whether this phase is gated by the reviewer swarm.
    pub fn is_review(&self) -> bool {
        matches!(self, Phase::PlanReview | Phase::CodeReview)
    }

    /// Whether the core stops evaluating sessions in this phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::ReadyToMerge)
    }

    /// Phase entered when every reviewer approves. `None` outside review phases.
    pub fn on_approval(&self) -> Option<Phase> {
        match self {
            Phase::PlanReview => Some(Phase::Implementing),
            Phase::CodeReview => Some(Phase::ReadyToMerge),
            _ => None,
        }
    }

    /// Phase re-entered when any reviewer requests changes. `None` outside review phases.
    pub fn on_changes_requested(&self) -> Option<Phase> {
        match self {
            Phase::PlanReview => Some(Phase::Planning),
            Phase::CodeReview => Some(Phase::Implementing),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Phase {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "planning" => Ok(Phase::Planning),
            "plan_review" => Ok(Phase::PlanReview),
            "implementing" => Ok(Phase::Implementing),
            "code_review" => Ok(Phase::CodeReview),
            "ready_to_merge" => Ok(Phase::ReadyToMerge),
            _ => anyhow::bail!(
                "Invalid phase '{}'. Valid values: planning, plan_review, implementing, code_review, ready_to_merge",
                s
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_string_forms_parse_back() {
        for phase in Phase::ALL {
            assert_eq!(phase.as_str().parse::<Phase>().unwrap(), phase);
        }
    }

    #[test]
    fn test_phase_parse_accepts_hyphens_and_case() {
        assert_eq!("Plan-Review".parse::<Phase>().unwrap(), Phase::PlanReview);
        assert_eq!(" CODE_REVIEW ".parse::<Phase>().unwrap(), Phase::CodeReview);
    }

    #[test]
    fn test_phase_parse_rejects_unknown() {
        let err = "merging".parse::<Phase>().unwrap_err();
        assert!(err.to_string().contains("merging"));
    }

    #[test]
    fn test_review_transitions() {
        assert_eq!(Phase::PlanReview.on_approval(), Some(Phase::Implementing));
        assert_eq!(Phase::CodeReview.on_approval(), Some(Phase::ReadyToMerge));
        assert_eq!(
            Phase::PlanReview.on_changes_requested(),
            Some(Phase::Planning)
        );
        assert_eq!(
            Phase::CodeReview.on_changes_requested(),
            Some(Phase::Implementing)
        );
        assert_eq!(Phase::Implementing.on_approval(), None);
        assert_eq!(Phase::Planning.on_changes_requested(), None);
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&Phase::ReadyToMerge).unwrap();
        assert_eq!(json, "\"ready_to_merge\"");
        let parsed: Phase = serde_json::from_str("\"plan_review\"").unwrap();
        assert_eq!(parsed, Phase::PlanReview);
    }

    #[test]
    fn test_only_ready_to_merge_is_terminal() {
        let terminal: Vec<_> = Phase::ALL.iter().filter(|p| p.is_terminal()).collect();
        assert_eq!(terminal, vec![&Phase::ReadyToMerge]);
    }
}
