//! Phase evaluator: the pure decision function of the workflow.
//!
//! Given the recorded phase, round counters, workspace artifacts and the
//! session roster, [`evaluate`] returns the next phase, the round counters to
//! persist and, when a swarm should be running, the roles to keep live.
//! It performs no I/O.
//!
//! ## Rules
//!
//! - **Simple mode**: always PLANNING, nothing spawned
//! - **PLANNING**: wait for a plan (spawning the planning swarm if configured),
//!   then move to PLAN_REVIEW
//! - **PLAN_REVIEW / CODE_REVIEW**: any changes-requested sends the session
//!   back a phase and bumps rounds; unanimous approval moves it forward;
//!   otherwise spawn reviewers that haven't submitted
//! - **IMPLEMENTING**: distribute plan items to the implementation swarm, then
//!   move to CODE_REVIEW once the PR is waiting on review
//! - **READY_TO_MERGE**: terminal

pub mod tally;
pub mod work_items;

pub use tally::{GateStatus, ReviewTally};
pub use work_items::{Assignment, assign_work_items};

use crate::artifacts::{PlanArtifact, ReviewArtifact, ReviewRole};
use crate::config::{SwarmConfig, WorkflowConfig};
use crate::metadata::{Rounds, SessionMetadata};
use crate::phase::Phase;
use crate::session::Session;
use crate::swarm::prompts::{
    PromptContext, build_implementation_prompt, build_planning_prompt, build_review_prompt,
};
use crate::swarm::{SwarmCoverage, SwarmMember, SwarmRequest};

/// Everything one evaluation looks at.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationInput<'a> {
    pub session: &'a Session,
    /// Phase recorded in metadata (falling back to the session's own).
    pub phase: Phase,
    pub metadata: &'a SessionMetadata,
    pub workflow: &'a WorkflowConfig,
    pub plan: Option<&'a PlanArtifact>,
    /// Review records for the current review round. Ignored outside review phases.
    pub reviews: &'a [ReviewArtifact],
    pub roster: &'a [Session],
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub phase: Phase,
    pub rounds: Rounds,
    pub implementation_swarm_round: Option<u32>,
    pub swarm: Option<SwarmRequest>,
    /// Review verdict, when the phase was a review phase.
    pub tally: Option<ReviewTally>,
}

impl Decision {
    /// Same phase, counters exactly as stored.
    fn unchanged(phase: Phase, metadata: &SessionMetadata) -> Self {
        Self {
            phase,
            rounds: metadata.rounds,
            implementation_swarm_round: metadata.implementation_swarm_round,
            swarm: None,
            tally: None,
        }
    }

    fn to(phase: Phase, rounds: Rounds, metadata: &SessionMetadata) -> Self {
        Self {
            phase,
            rounds,
            implementation_swarm_round: metadata.implementation_swarm_round,
            swarm: None,
            tally: None,
        }
    }

    fn with_swarm(mut self, swarm: Option<SwarmRequest>) -> Self {
        self.swarm = swarm;
        self
    }

    fn with_tally(mut self, tally: ReviewTally) -> Self {
        self.tally = Some(tally);
        self
    }
}

/// Decide the next phase for one session.
pub fn evaluate(input: &EvaluationInput<'_>) -> Decision {
    if input.workflow.is_simple() {
        return Decision::unchanged(Phase::Planning, input.metadata);
    }

    match input.phase {
        Phase::Planning => evaluate_planning(input),
        Phase::PlanReview | Phase::CodeReview => evaluate_review(input),
        Phase::Implementing => evaluate_implementing(input),
        Phase::ReadyToMerge => Decision::unchanged(Phase::ReadyToMerge, input.metadata),
    }
}

fn evaluate_planning(input: &EvaluationInput<'_>) -> Decision {
    let rounds = input.metadata.rounds.resolved();
    let plan_round = rounds.plan();

    // Past round 1 only a plan marked for the current round counts.
    let plan_ready = input
        .plan
        .is_some_and(|plan| plan_round == 1 || plan.is_for_round(plan_round));

    if !plan_ready {
        let swarm = configured(&input.workflow.planning_swarm).map(|config| {
            let ctx = prompt_context(input);
            let members = config
                .roles
                .iter()
                .map(|role| SwarmMember::new(role, build_planning_prompt(&ctx, role, plan_round)))
                .collect();
            SwarmRequest::new(Phase::Planning, plan_round, members)
                .with_max_agents(config.max_agents)
        });
        return Decision::to(Phase::Planning, rounds, input.metadata).with_swarm(swarm);
    }

    Decision::to(Phase::PlanReview, rounds, input.metadata)
}

fn evaluate_review(input: &EvaluationInput<'_>) -> Decision {
    let phase = input.phase;
    let mut rounds = input.metadata.rounds.resolved();
    let round = match phase {
        Phase::PlanReview => rounds.review(),
        _ => rounds.code_review(),
    };

    let current: Vec<ReviewArtifact> = input
        .reviews
        .iter()
        .filter(|artifact| artifact.phase == phase && artifact.round == round)
        .cloned()
        .collect();
    let tally = ReviewTally::from_artifacts(&ReviewRole::ALL, &current);

    match tally.status {
        GateStatus::ChangesRequested => {
            // Saturate so a counter at u32::MAX never wraps to the unset 0.
            if phase == Phase::PlanReview {
                rounds.review = Some(round.saturating_add(1));
                rounds.plan = Some(rounds.plan().saturating_add(1));
            } else {
                rounds.code_review = Some(round.saturating_add(1));
                rounds.implementation = Some(rounds.implementation().saturating_add(1));
            }
            let next = phase.on_changes_requested().unwrap_or(phase);
            Decision::to(next, rounds, input.metadata).with_tally(tally)
        }
        GateStatus::Approved => {
            let next = phase.on_approval().unwrap_or(phase);
            Decision::to(next, rounds, input.metadata).with_tally(tally)
        }
        GateStatus::Pending => {
            let ctx = prompt_context(input);
            let members = tally
                .missing
                .iter()
                .map(|role| {
                    SwarmMember::new(role.as_str(), build_review_prompt(&ctx, phase, round, *role))
                })
                .collect();
            Decision::to(phase, rounds, input.metadata)
                .with_swarm(Some(SwarmRequest::new(phase, round, members)))
                .with_tally(tally)
        }
    }
}

fn evaluate_implementing(input: &EvaluationInput<'_>) -> Decision {
    let rounds = input.metadata.rounds.resolved();
    let round = rounds.implementation();
    let mut decision = Decision::to(Phase::Implementing, rounds, input.metadata);

    if let Some(config) = configured(&input.workflow.implementation_swarm)
        && decision.implementation_swarm_round != Some(round)
    {
        let items = input.plan.map(PlanArtifact::work_items).unwrap_or_default();
        let assignments = assign_work_items(&config.roles, &items);
        let coverage = SwarmCoverage::from_roster(
            input.roster,
            &input.session.id,
            Phase::Implementing,
            round,
        );
        let ctx = prompt_context(input);

        // Finished members are not respawned; their item is done.
        let members: Vec<SwarmMember> = assignments
            .iter()
            .filter_map(|a| a.item.as_deref().map(|item| (a.role.as_str(), item)))
            .filter(|(role, _)| !coverage.is_covered(role) && !coverage.is_finished(role))
            .map(|(role, item)| {
                SwarmMember::new(
                    role,
                    build_implementation_prompt(&ctx, role, round, item, input.plan),
                )
            })
            .collect();

        if !members.is_empty() {
            let request = SwarmRequest::new(Phase::Implementing, round, members)
                .with_max_agents(config.max_agents);
            return decision.with_swarm(Some(request));
        }

        decision.implementation_swarm_round = Some(round);
    }

    if input.workflow.auto_code_review && input.session.is_awaiting_code_review() {
        decision.phase = Phase::CodeReview;
    }

    decision
}

/// A swarm config with at least one role.
fn configured(swarm: &Option<SwarmConfig>) -> Option<&SwarmConfig> {
    swarm.as_ref().filter(|config| !config.roles.is_empty())
}

fn prompt_context<'a>(input: &EvaluationInput<'a>) -> PromptContext<'a> {
    PromptContext {
        parent_session_id: &input.session.id,
        project_id: &input.session.project_id,
        workspace: &input.session.workspace_path,
        issue: input.metadata.issue.as_deref(),
        branch: input
            .metadata
            .branch
            .as_deref()
            .or(input.session.branch.as_deref()),
    }
}
